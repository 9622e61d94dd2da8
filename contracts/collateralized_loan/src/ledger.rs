//! Pure loan state machine.
//!
//! Each transition takes the stored loan and the call context and either
//! rejects the call or describes everything the contract must do: value to
//! pull from the caller, payouts out of custody, the updated record and the
//! notification to publish. Nothing here touches storage or tokens, so every
//! rejection is a no-op by construction.

use soroban_sdk::Address;

use crate::error::Error;
use crate::events::LoanEvent;
use crate::types::{Loan, LoanStatus, COLLATERAL_RATIO_PCT, PERCENT};

/// Who is calling, how much value they attached, and the ledger time the
/// call is evaluated at. `now` is sampled once per call.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub caller: Address,
    pub attached: i128,
    pub now: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub to: Address,
    pub amount: i128,
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub loan: Loan,
    /// Pulled from the caller into custody before any payout.
    pub escrow_in: i128,
    pub payouts: [Option<Payout>; 2],
    /// Change to the collateral held for open loans.
    pub custody_delta: i128,
    pub event: LoanEvent,
}

pub fn loan_amount_for(collateral: i128) -> Result<i128, Error> {
    let scaled = collateral.checked_mul(COLLATERAL_RATIO_PCT).ok_or(Error::Overflow)?;
    Ok(scaled / PERCENT)
}

/// Principal plus flat interest; interest truncates toward zero.
pub fn repayment_amount(loan: &Loan) -> Result<i128, Error> {
    let interest = loan
        .loan_amount
        .checked_mul(loan.interest_rate as i128)
        .ok_or(Error::Overflow)?
        / PERCENT;
    loan.loan_amount.checked_add(interest).ok_or(Error::Overflow)
}

fn require_status(loan: &Loan, status: LoanStatus) -> Result<(), Error> {
    if loan.status != status {
        return Err(Error::InvalidState);
    }
    Ok(())
}

pub fn request(id: u64, ctx: &CallContext, interest_rate: u32, duration: u64) -> Result<Transition, Error> {
    if ctx.attached <= 0 {
        return Err(Error::InvalidAmount);
    }
    if duration == 0 {
        return Err(Error::InvalidDuration);
    }
    let loan_amount = loan_amount_for(ctx.attached)?;
    if loan_amount <= 0 {
        return Err(Error::InvalidAmount);
    }

    let loan = Loan {
        id,
        borrower: ctx.caller.clone(),
        lender: None,
        collateral_amount: ctx.attached,
        loan_amount,
        interest_rate,
        duration,
        due_time: None,
        status: LoanStatus::Requested,
    };
    Ok(Transition {
        escrow_in: ctx.attached,
        payouts: [None, None],
        custody_delta: ctx.attached,
        event: LoanEvent::Requested {
            id,
            borrower: ctx.caller.clone(),
            loan_amount,
            interest_rate,
            duration,
        },
        loan,
    })
}

pub fn fund(loan: &Loan, ctx: &CallContext) -> Result<Transition, Error> {
    require_status(loan, LoanStatus::Requested)?;
    if ctx.caller == loan.borrower {
        return Err(Error::SelfFunding);
    }
    if ctx.attached != loan.loan_amount {
        return Err(Error::WrongAmount);
    }
    let due_time = ctx.now.checked_add(loan.duration).ok_or(Error::Overflow)?;

    let mut next = loan.clone();
    next.lender = Some(ctx.caller.clone());
    next.due_time = Some(due_time);
    next.status = LoanStatus::Funded;

    // Principal passes straight through custody to the borrower.
    Ok(Transition {
        escrow_in: ctx.attached,
        payouts: [Some(Payout { to: loan.borrower.clone(), amount: loan.loan_amount }), None],
        custody_delta: 0,
        event: LoanEvent::Funded {
            id: loan.id,
            loan_amount: loan.loan_amount,
            lender: ctx.caller.clone(),
            borrower: loan.borrower.clone(),
        },
        loan: next,
    })
}

pub fn repay(loan: &Loan, ctx: &CallContext) -> Result<Transition, Error> {
    require_status(loan, LoanStatus::Funded)?;
    let (lender, due_time) = match (&loan.lender, loan.due_time) {
        (Some(lender), Some(due_time)) => (lender.clone(), due_time),
        _ => return Err(Error::InvalidState),
    };
    if ctx.caller != loan.borrower {
        return Err(Error::NotBorrower);
    }
    if ctx.now > due_time {
        return Err(Error::PastDue);
    }
    let owed = repayment_amount(loan)?;
    if ctx.attached != owed {
        return Err(Error::WrongAmount);
    }

    let mut next = loan.clone();
    next.status = LoanStatus::Repaid;

    Ok(Transition {
        escrow_in: ctx.attached,
        payouts: [
            Some(Payout { to: lender.clone(), amount: owed }),
            Some(Payout { to: loan.borrower.clone(), amount: loan.collateral_amount }),
        ],
        custody_delta: -loan.collateral_amount,
        event: LoanEvent::Repaid {
            id: loan.id,
            repayment_amount: owed,
            lender,
            borrower: loan.borrower.clone(),
        },
        loan: next,
    })
}

pub fn claim(loan: &Loan, ctx: &CallContext) -> Result<Transition, Error> {
    require_status(loan, LoanStatus::Funded)?;
    let (lender, due_time) = match (&loan.lender, loan.due_time) {
        (Some(lender), Some(due_time)) => (lender.clone(), due_time),
        _ => return Err(Error::InvalidState),
    };
    if ctx.caller != lender {
        return Err(Error::NotLender);
    }
    if ctx.now <= due_time {
        return Err(Error::NotYetDue);
    }

    let mut next = loan.clone();
    next.status = LoanStatus::Defaulted;

    Ok(Transition {
        escrow_in: 0,
        payouts: [Some(Payout { to: lender.clone(), amount: loan.collateral_amount }), None],
        custody_delta: -loan.collateral_amount,
        event: LoanEvent::CollateralClaimed {
            id: loan.id,
            borrower: loan.borrower.clone(),
            lender,
            collateral_amount: loan.collateral_amount,
        },
        loan: next,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::{testutils::Address as _, Env};

    const UNIT: i128 = 10_000_000;

    fn ctx(caller: &Address, attached: i128, now: u64) -> CallContext {
        CallContext { caller: caller.clone(), attached, now }
    }

    /// Sum of everything entering and leaving custody for one transition.
    fn net_flow(t: &Transition) -> i128 {
        let out: i128 = t.payouts.iter().flatten().map(|p| p.amount).sum();
        t.escrow_in - out
    }

    fn funded(e: &Env) -> (Loan, Address, Address) {
        let borrower = Address::generate(e);
        let lender = Address::generate(e);
        let requested = request(1, &ctx(&borrower, UNIT, 100), 5, 300).unwrap().loan;
        let loan = fund(&requested, &ctx(&lender, 8 * UNIT / 10, 1_000)).unwrap().loan;
        (loan, borrower, lender)
    }

    #[test]
    fn test_loan_amount_is_eighty_percent() {
        assert_eq!(loan_amount_for(UNIT).unwrap(), 8_000_000);
        assert_eq!(loan_amount_for(5).unwrap(), 4);
        for collateral in [2i128, 7, 99, 1_000_001, UNIT * 3] {
            let amount = loan_amount_for(collateral).unwrap();
            assert!(amount < collateral);
        }
        assert_eq!(loan_amount_for(i128::MAX), Err(Error::Overflow));
    }

    #[test]
    fn test_request_validation() {
        let e = Env::default();
        let borrower = Address::generate(&e);

        assert_eq!(request(1, &ctx(&borrower, 0, 0), 5, 300).unwrap_err(), Error::InvalidAmount);
        assert_eq!(request(1, &ctx(&borrower, -5, 0), 5, 300).unwrap_err(), Error::InvalidAmount);
        // 1 * 80 / 100 truncates to nothing to lend
        assert_eq!(request(1, &ctx(&borrower, 1, 0), 5, 300).unwrap_err(), Error::InvalidAmount);
        assert_eq!(request(1, &ctx(&borrower, UNIT, 0), 5, 0).unwrap_err(), Error::InvalidDuration);

        let t = request(7, &ctx(&borrower, UNIT, 0), 0, 300).unwrap();
        assert_eq!(t.loan.id, 7);
        assert_eq!(t.loan.status, LoanStatus::Requested);
        assert_eq!(t.loan.lender, None);
        assert_eq!(t.loan.due_time, None);
        assert_eq!(t.escrow_in, UNIT);
        assert_eq!(t.custody_delta, UNIT);
        assert_eq!(t.payouts, [None, None]);
    }

    #[test]
    fn test_due_time_counts_from_funding() {
        let e = Env::default();
        let (loan, _, lender) = funded(&e);
        assert_eq!(loan.due_time, Some(1_300));
        assert_eq!(loan.lender, Some(lender));
        assert_eq!(loan.status, LoanStatus::Funded);
    }

    #[test]
    fn test_fund_rejections() {
        let e = Env::default();
        let borrower = Address::generate(&e);
        let lender = Address::generate(&e);
        let loan = request(1, &ctx(&borrower, UNIT, 0), 5, 300).unwrap().loan;

        assert_eq!(fund(&loan, &ctx(&borrower, 8_000_000, 0)).unwrap_err(), Error::SelfFunding);
        assert_eq!(fund(&loan, &ctx(&lender, 7_999_999, 0)).unwrap_err(), Error::WrongAmount);
        assert_eq!(fund(&loan, &ctx(&lender, 0, 0)).unwrap_err(), Error::WrongAmount);
        assert_eq!(fund(&loan, &ctx(&lender, 8_000_000, u64::MAX)).unwrap_err(), Error::Overflow);

        let (funded, _, _) = funded(&e);
        let other = Address::generate(&e);
        assert_eq!(fund(&funded, &ctx(&other, 8_000_000, 0)).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn test_repay_window_is_inclusive() {
        let e = Env::default();
        let (loan, borrower, lender) = funded(&e);

        let t = repay(&loan, &ctx(&borrower, 8_400_000, 1_300)).unwrap();
        assert_eq!(t.loan.status, LoanStatus::Repaid);
        assert_eq!(t.payouts[0], Some(Payout { to: lender, amount: 8_400_000 }));
        assert_eq!(t.payouts[1], Some(Payout { to: borrower.clone(), amount: UNIT }));

        assert_eq!(repay(&loan, &ctx(&borrower, 8_400_000, 1_301)).unwrap_err(), Error::PastDue);
    }

    #[test]
    fn test_repay_rejections() {
        let e = Env::default();
        let (loan, borrower, lender) = funded(&e);

        assert_eq!(repay(&loan, &ctx(&lender, 8_400_000, 1_100)).unwrap_err(), Error::NotBorrower);
        assert_eq!(repay(&loan, &ctx(&borrower, 8_000_000, 1_100)).unwrap_err(), Error::WrongAmount);
        assert_eq!(repay(&loan, &ctx(&borrower, 8_400_001, 1_100)).unwrap_err(), Error::WrongAmount);

        let repaid = repay(&loan, &ctx(&borrower, 8_400_000, 1_100)).unwrap().loan;
        assert_eq!(repay(&repaid, &ctx(&borrower, 8_400_000, 1_100)).unwrap_err(), Error::InvalidState);
        assert_eq!(claim(&repaid, &ctx(&lender, 0, 5_000)).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn test_claim_only_after_due_time() {
        let e = Env::default();
        let (loan, borrower, lender) = funded(&e);

        assert_eq!(claim(&loan, &ctx(&lender, 0, 1_300)).unwrap_err(), Error::NotYetDue);
        assert_eq!(claim(&loan, &ctx(&borrower, 0, 1_301)).unwrap_err(), Error::NotLender);

        let t = claim(&loan, &ctx(&lender, 0, 1_301)).unwrap();
        assert_eq!(t.loan.status, LoanStatus::Defaulted);
        assert_eq!(t.escrow_in, 0);
        assert_eq!(t.custody_delta, -UNIT);
        assert_eq!(t.payouts[0], Some(Payout { to: lender.clone(), amount: UNIT }));

        assert_eq!(claim(&t.loan, &ctx(&lender, 0, 1_302)).unwrap_err(), Error::InvalidState);
        assert_eq!(repay(&t.loan, &ctx(&borrower, 8_400_000, 1_302)).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn test_requested_loan_cannot_be_resolved() {
        let e = Env::default();
        let borrower = Address::generate(&e);
        let lender = Address::generate(&e);
        let loan = request(1, &ctx(&borrower, UNIT, 0), 5, 300).unwrap().loan;

        assert_eq!(repay(&loan, &ctx(&borrower, 8_400_000, 10)).unwrap_err(), Error::InvalidState);
        assert_eq!(claim(&loan, &ctx(&lender, 0, 10_000)).unwrap_err(), Error::InvalidState);
    }

    #[test]
    fn test_custody_balances_across_lifecycle() {
        let e = Env::default();
        let borrower = Address::generate(&e);
        let lender = Address::generate(&e);

        let req = request(1, &ctx(&borrower, 3 * UNIT, 0), 12, 60).unwrap();
        let fnd = fund(&req.loan, &ctx(&lender, 24_000_000, 10)).unwrap();
        let owed = repayment_amount(&fnd.loan).unwrap();
        assert_eq!(owed, 26_880_000);
        let rep = repay(&fnd.loan, &ctx(&borrower, owed, 70)).unwrap();

        // what custody gains on a transition is exactly the collateral it now holds
        for t in [&req, &fnd, &rep] {
            assert_eq!(net_flow(t), t.custody_delta);
        }
        assert_eq!(req.custody_delta + fnd.custody_delta + rep.custody_delta, 0);

        let clm = claim(&fnd.loan, &ctx(&lender, 0, 71)).unwrap();
        assert_eq!(net_flow(&clm), clm.custody_delta);
        assert_eq!(req.custody_delta + fnd.custody_delta + clm.custody_delta, 0);
    }

    #[test]
    fn test_events_carry_transition_fields() {
        let e = Env::default();
        let (loan, borrower, lender) = funded(&e);
        let t = repay(&loan, &ctx(&borrower, 8_400_000, 1_000)).unwrap();
        assert_eq!(
            t.event,
            LoanEvent::Repaid { id: 1, repayment_amount: 8_400_000, lender, borrower }
        );
    }
}
