//! Purchase orchestration for the marketplace.
//!
//! - [`payment`]: fee split and the gateway gate
//! - [`orchestrator`]: bundle and product purchases
//! - [`checkout`]: cart management and multi-line checkout
//! - [`fulfillment`]: warehouse lifecycle and the durable delayed-job runner
//! - [`unpack`], [`review`]: the two producers of trust events
//! - [`metrics`]: read-side views

pub mod checkout;
pub mod error;
pub mod fulfillment;
pub mod metrics;
pub mod orchestrator;
pub mod payment;
pub mod review;
pub mod saga;
pub mod unpack;

pub use checkout::{CheckoutLine, CheckoutOrchestrator, CheckoutSummary};
pub use error::{ConflictKind, OrderError, OrderResult};
pub use fulfillment::{FulfillmentScheduler, FulfillmentStateMachine, RunReport, SchedulerPolicy, Transition};
pub use metrics::ReportingService;
pub use orchestrator::{BundlePurchase, OrderOrchestrator, ProductPurchase};
pub use payment::{compute_fees, FeeSchedule, PaymentComputer, ScriptedGateway, SimulatedGateway};
pub use review::{ReviewRatingService, ReviewSubmission};
pub use saga::{Compensation, CompensationLog, Repositories};
pub use unpack::{ListingUpdate, ProductDraft, UnpackService};
