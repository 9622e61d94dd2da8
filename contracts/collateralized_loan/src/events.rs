use soroban_sdk::{symbol_short, Address, Env, Symbol};

pub const REQUESTED: Symbol = symbol_short!("requested");
pub const FUNDED: Symbol = symbol_short!("funded");
pub const REPAID: Symbol = symbol_short!("repaid");
pub const CLAIMED: Symbol = symbol_short!("claimed");

/// Notification produced by a successful transition. The loan id goes into
/// the topic; the payload carries the remaining fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoanEvent {
    Requested { id: u64, borrower: Address, loan_amount: i128, interest_rate: u32, duration: u64 },
    Funded { id: u64, loan_amount: i128, lender: Address, borrower: Address },
    Repaid { id: u64, repayment_amount: i128, lender: Address, borrower: Address },
    CollateralClaimed { id: u64, borrower: Address, lender: Address, collateral_amount: i128 },
}

impl LoanEvent {
    pub fn publish(self, e: &Env) {
        match self {
            LoanEvent::Requested { id, borrower, loan_amount, interest_rate, duration } => {
                e.events().publish((REQUESTED, id), (borrower, loan_amount, interest_rate, duration));
            }
            LoanEvent::Funded { id, loan_amount, lender, borrower } => {
                e.events().publish((FUNDED, id), (loan_amount, lender, borrower));
            }
            LoanEvent::Repaid { id, repayment_amount, lender, borrower } => {
                e.events().publish((REPAID, id), (repayment_amount, lender, borrower));
            }
            LoanEvent::CollateralClaimed { id, borrower, lender, collateral_amount } => {
                e.events().publish((CLAIMED, id), (borrower, lender, collateral_amount));
            }
        }
    }
}
