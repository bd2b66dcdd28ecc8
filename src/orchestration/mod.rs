//! Service layer tying the conversion engine to the reward ledger.

pub mod conversion;

pub use conversion::{
    BonusConversion, ClaimOutcome, ConversionService, InvestmentReceipt,
    PaymentConversionOutcome, ServiceError,
};
