pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use domain::cart::{CartItem, DiscountRange, DiscountSource, HsnDetails, TaxComponent, TaxRule};
pub use domain::product::{ProductId, SellerId};
pub use domain::settings::{CalculationOptions, CalculationSettings, TaxContext};
pub use errors::{ApplicationError, InterfaceError, PricingError};
pub use pricing::calculator::{
    CalculatedCart, CalculationMetadata, CalculationWarning, CartCalculator, CartValue,
    WarningCode,
};
pub use pricing::cash::CashDiscountApplier;
pub use pricing::discount::{resolve_discount, DiscountResolution, TieredDiscountResolver};
pub use pricing::quantity::{validate_quantity, QuantityRules};
pub use pricing::tax::{resolve_tax, TaxResolution};
pub use pricing::volume::{
    AlwaysCombine, BasicDiscountPrecedence, DiscountCombinationPolicy, VolumeDiscountCalculator,
    VolumeDiscountDetails,
};
pub use pricing::CalculationRequest;
