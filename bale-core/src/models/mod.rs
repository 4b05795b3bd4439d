//! Records owned by the transaction engine and the collaborator records it reads.

/// Gives a status-like enum a stable string form for storage columns and logs.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(crate::CoreError::ValidationError(format!(
                        "unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod bundle;
pub mod cart;
pub mod job;
pub mod order;
pub mod payment;
pub mod product;
pub mod review;
pub mod user;
pub mod warehouse;

pub use bundle::{Bundle, BundleStatus};
pub use cart::CartItem;
pub use job::{JobKind, ScheduledJob};
pub use order::{Order, OrderStatus, OrderSubject};
pub use payment::{FeeBreakdown, Payment, PaymentStatus, PaymentType};
pub use product::{Product, ProductStatus};
pub use review::ReviewRating;
pub use user::{Role, TrustProfile, User};
pub use warehouse::{WarehouseItem, WarehouseStatus};
