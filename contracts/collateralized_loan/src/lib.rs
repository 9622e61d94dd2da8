#![no_std]
use soroban_sdk::{contract, contractimpl, log, token, Address, Env};

mod error;
mod events;
mod ledger;
mod storage;
mod types;

pub use error::Error;
pub use types::{Loan, LoanStatus, COLLATERAL_RATIO_PCT};

use ledger::{CallContext, Transition};

#[contract]
pub struct CollateralizedLoan;

#[contractimpl]
impl CollateralizedLoan {
    /// One-time initializer. `token` is the asset collateral, principal and
    /// repayments are settled in.
    pub fn init(e: Env, token: Address) -> Result<(), Error> {
        if storage::has_token(&e) {
            return Err(Error::AlreadyInitialized);
        }
        storage::put_token(&e, &token);
        storage::extend_instance(&e);
        Ok(())
    }

    /// Borrower locks `collateral` and opens a loan request for 80% of it.
    /// Returns the new loan id.
    pub fn request_loan(
        e: Env,
        borrower: Address,
        collateral: i128,
        interest_rate: u32,
        duration: u64,
    ) -> Result<u64, Error> {
        borrower.require_auth();
        let token = storage::get_token(&e)?;

        let ctx = Self::context(&e, borrower, collateral);
        let id = storage::next_id(&e);
        let t = ledger::request(id, &ctx, interest_rate, duration)?;

        storage::put_last_id(&e, id);
        Self::apply(&e, &token, &ctx, t);
        Ok(id)
    }

    /// Lender sends exactly the loan amount, which goes straight to the
    /// borrower. Starts the repayment clock.
    pub fn fund_loan(e: Env, lender: Address, id: u64, amount: i128) -> Result<(), Error> {
        lender.require_auth();
        let token = storage::get_token(&e)?;
        let loan = storage::get_loan(&e, id)?;

        let ctx = Self::context(&e, lender, amount);
        let t = ledger::fund(&loan, &ctx)?;
        Self::apply(&e, &token, &ctx, t);
        Ok(())
    }

    /// Borrower pays principal plus interest on or before the due time and
    /// gets the collateral back.
    pub fn repay_loan(e: Env, borrower: Address, id: u64, amount: i128) -> Result<(), Error> {
        borrower.require_auth();
        let token = storage::get_token(&e)?;
        let loan = storage::get_loan(&e, id)?;

        let ctx = Self::context(&e, borrower, amount);
        let t = ledger::repay(&loan, &ctx)?;
        Self::apply(&e, &token, &ctx, t);
        Ok(())
    }

    /// Lender takes the collateral of a loan left unpaid past its due time.
    pub fn claim_collateral(e: Env, lender: Address, id: u64) -> Result<(), Error> {
        lender.require_auth();
        let token = storage::get_token(&e)?;
        let loan = storage::get_loan(&e, id)?;

        let ctx = Self::context(&e, lender, 0);
        let t = ledger::claim(&loan, &ctx)?;
        Self::apply(&e, &token, &ctx, t);
        Ok(())
    }

    pub fn get_loan(e: Env, id: u64) -> Result<Loan, Error> {
        storage::get_loan(&e, id)
    }

    /// Exact amount `repay_loan` expects for this loan.
    pub fn repayment_amount(e: Env, id: u64) -> Result<i128, Error> {
        let loan = storage::get_loan(&e, id)?;
        ledger::repayment_amount(&loan)
    }

    pub fn loan_count(e: Env) -> u64 {
        storage::last_id(&e)
    }

    /// Collateral held for loans that are not yet repaid or defaulted.
    pub fn escrowed(e: Env) -> i128 {
        storage::get_escrowed(&e)
    }

    pub fn token(e: Env) -> Result<Address, Error> {
        storage::get_token(&e)
    }

    fn context(e: &Env, caller: Address, attached: i128) -> CallContext {
        CallContext { caller, attached, now: e.ledger().timestamp() }
    }

    // Only reached once the transition is validated; token transfers either
    // all land or abort the whole invocation.
    fn apply(e: &Env, token: &Address, ctx: &CallContext, t: Transition) {
        let client = token::Client::new(e, token);
        let me = e.current_contract_address();

        if t.escrow_in > 0 {
            client.transfer(&ctx.caller, &me, &t.escrow_in);
        }
        for payout in t.payouts.iter().flatten() {
            client.transfer(&me, &payout.to, &payout.amount);
        }

        storage::put_loan(e, &t.loan);
        storage::put_escrowed(e, storage::get_escrowed(e) + t.custody_delta);

        log!(e, "loan transition", t.loan.id, t.loan.status, ctx.now);
        t.event.publish(e);
    }
}
