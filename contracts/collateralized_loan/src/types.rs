use soroban_sdk::{contracttype, Address};

/// Loan amount as a percentage of the posted collateral.
pub const COLLATERAL_RATIO_PCT: i128 = 80;
pub const PERCENT: i128 = 100;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoanStatus {
    Requested,
    Funded,
    Repaid,
    Defaulted,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Loan {
    pub id: u64,
    pub borrower: Address,
    pub lender: Option<Address>,
    pub collateral_amount: i128,
    pub loan_amount: i128,
    pub interest_rate: u32,  // percent, flat over the term
    pub duration: u64,       // seconds, counted from funding
    pub due_time: Option<u64>,
    pub status: LoanStatus,
}
