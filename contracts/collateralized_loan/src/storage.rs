use soroban_sdk::{contracttype, Address, Env};

use crate::error::Error;
use crate::types::Loan;

pub const DAY_IN_LEDGERS: u32 = 17_280;
pub const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
pub const INSTANCE_LIFETIME_THRESHOLD: u32 = INSTANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;
pub const LOAN_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const SECONDS_PER_LEDGER: u64 = 5;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Token,
    LastId,
    Escrowed,
    Loan(u64),
}

pub fn has_token(e: &Env) -> bool {
    e.storage().instance().has(&DataKey::Token)
}

pub fn get_token(e: &Env) -> Result<Address, Error> {
    e.storage().instance().get(&DataKey::Token).ok_or(Error::NotInitialized)
}

pub fn put_token(e: &Env, token: &Address) {
    e.storage().instance().set(&DataKey::Token, token);
}

/// Highest id handed out so far; 0 before the first request.
pub fn last_id(e: &Env) -> u64 {
    e.storage().instance().get(&DataKey::LastId).unwrap_or(0)
}

pub fn next_id(e: &Env) -> u64 {
    last_id(e) + 1
}

pub fn put_last_id(e: &Env, id: u64) {
    e.storage().instance().set(&DataKey::LastId, &id);
}

pub fn get_loan(e: &Env, id: u64) -> Result<Loan, Error> {
    e.storage().persistent().get(&DataKey::Loan(id)).ok_or(Error::LoanNotFound)
}

pub fn put_loan(e: &Env, loan: &Loan) {
    let key = DataKey::Loan(loan.id);
    e.storage().persistent().set(&key, loan);
    // The instance carries the token and counters every loan call reads, so
    // it lives at least as long as the record.
    let extend_to = loan_ttl(e, loan);
    let threshold = extend_to.saturating_sub(DAY_IN_LEDGERS);
    e.storage().persistent().extend_ttl(&key, threshold, extend_to);
    e.storage().instance().extend_ttl(threshold, extend_to);
}

// At least a month, and always past the due time of a funded loan plus a day
// for the lender to claim, capped at the network maximum.
fn loan_ttl(e: &Env, loan: &Loan) -> u32 {
    let until_due = match loan.due_time {
        Some(due) => due.saturating_sub(e.ledger().timestamp()) / SECONDS_PER_LEDGER + 1,
        None => 0,
    };
    let wanted = until_due
        .saturating_add(DAY_IN_LEDGERS as u64)
        .max(LOAN_BUMP_AMOUNT as u64);
    wanted.min(e.storage().max_ttl() as u64) as u32
}

pub fn extend_instance(e: &Env) {
    e.storage().instance().extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

/// Collateral currently held in custody across all open loans.
pub fn get_escrowed(e: &Env) -> i128 {
    e.storage().instance().get(&DataKey::Escrowed).unwrap_or(0)
}

pub fn put_escrowed(e: &Env, amount: i128) {
    e.storage().instance().set(&DataKey::Escrowed, &amount);
}
