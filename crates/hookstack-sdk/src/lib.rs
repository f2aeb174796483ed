//! # hookstack-sdk
//!
//! Public SDK for composing secret-backed webhook stacks as a Rust library.
//!
//! Provides two entry points:
//! - [`constructs`]: [`SecretConstruct`](constructs::SecretConstruct) and
//!   [`WebhookConstruct`](constructs::WebhookConstruct), reusable pieces that
//!   declare resources on a [`StackComposer`](hookstack_compose::StackComposer).
//! - [`WebhookStackBuilder`](builder::WebhookStackBuilder): Fluent API that
//!   wires both constructs into a complete stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use hookstack_sdk::builder::WebhookStackBuilder;
//!
//! let mut composer = WebhookStackBuilder::new("PaymentsStack")
//!     .secret_arn("arn:aws:secretsmanager:eu-west-1:123456789012:secret:stripe-AbCdEf")
//!     .artifact("app/payments_webhook")
//!     .memory_mb(512)
//!     .build()?;
//! let graph = composer.synthesize()?;
//! # Ok::<(), hookstack_common::error::HookstackError>(())
//! ```

pub mod builder;
pub mod constructs;

pub use builder::WebhookStackBuilder;
pub use constructs::{SecretConstruct, WebhookConstruct, WebhookProps};
