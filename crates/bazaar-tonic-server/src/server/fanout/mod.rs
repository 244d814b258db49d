//! Downstream vendor fan-out.
//!
//! One product query becomes one call per configured vendor endpoint. The
//! [`client::VendorClient`] performs a single request-reply call against
//! one endpoint under a per-call deadline; [`coordinator::gather_bids`]
//! issues the calls for all endpoints concurrently and joins the results in
//! endpoint-configuration order, so the bid ordering in every reply is
//! deterministic regardless of vendor response latency.
//!
//! Vendor failures are absorbed here: a vendor that is unreachable, answers
//! with a non-OK status, or misses the deadline is logged and its bid is
//! omitted. Nothing from the fan-out ever aborts the owning request.

pub mod client;
pub mod coordinator;
