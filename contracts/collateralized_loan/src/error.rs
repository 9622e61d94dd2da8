use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    /// No value attached, or too little to back a loan.
    InvalidAmount = 3,
    /// Attached value differs from the exact amount owed.
    WrongAmount = 4,
    LoanNotFound = 5,
    InvalidState = 6,
    NotBorrower = 7,
    NotLender = 8,
    PastDue = 9,
    NotYetDue = 10,
    InvalidDuration = 11,
    SelfFunding = 12,
    Overflow = 13,
}
