//! Per-request slots and their lifecycle bookkeeping.
//!
//! This module defines the [`RequestRegistry`], the owner of every
//! in-flight request. Each accepted request is a [`RequestSlot`] keyed by a
//! generated [`RequestTag`]; the tag is the only thing that ever travels
//! through the completion channel and the work queue. A tag that no longer
//! resolves (or resolves to a slot in the wrong phase) is stale and the
//! corresponding event is dropped, so a finished slot can never be touched
//! again.
//!
//! ## Lifecycle
//!
//! - A slot is created in [`Lifecycle::Accepting`]; its tag is published to
//!   the accept mailbox so the next arriving RPC can claim it.
//! - The gRPC handler attaches the product name and a oneshot reply sender
//!   to the claimed slot, then emits the arrival event.
//! - A worker resuming the arrival moves the slot to
//!   [`Lifecycle::Dispatching`] and, after the fan-out, completes the RPC
//!   through the stored sender, moving the slot to [`Lifecycle::Finishing`].
//! - A worker resuming the finish acknowledgement removes the slot.
//!
//! Creation and destruction are counted so leak-freedom is observable: once
//! all in-flight requests have drained, `created - destroyed` equals the
//! number of live slots, which is exactly the one pending accept slot.

use std::collections::HashMap;

use bazaar_tonic_core::{
    Error, Result,
    proto::ProductReply,
    types::{Lifecycle, RequestTag},
};
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// One accepted request: lifecycle phase, request payload, and the handle
/// used to complete the RPC.
struct RequestSlot {
    state: Lifecycle,
    product_name: Option<String>,
    reply_tx: Option<oneshot::Sender<ProductReply>>,
}

/// What a worker should do with a resumed slot.
#[derive(Debug)]
pub enum Resumption {
    /// The slot was accepting and carries a request: run the fan-out.
    Dispatch { product_name: String },
    /// The finish acknowledgement arrived: destroy the slot.
    Destroy,
}

/// Outcome of completing a request's RPC.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The reply reached the transport layer; the finish acknowledgement
    /// will follow through the completion channel.
    Delivered,
    /// The client went away before completion; no acknowledgement will ever
    /// arrive and the caller must destroy the slot itself.
    Abandoned,
}

/// Snapshot of the registry's construction/destruction counters.
#[derive(Debug, Clone, Copy)]
pub struct RegistryStats {
    pub created: u64,
    pub destroyed: u64,
    pub live: usize,
}

/// Registry of all in-flight request slots, keyed by generated tag.
///
/// All state transitions happen under one mutex and never hold it across an
/// await point. Each slot is only ever advanced by the single worker that
/// dequeued its event, so the lock is contended briefly and only for
/// bookkeeping.
pub struct RequestRegistry {
    slots: Mutex<HashMap<RequestTag, RequestSlot>>,
    next_tag: AtomicU64,
    created: AtomicU64,
    destroyed: AtomicU64,
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_tag: AtomicU64::new(1),
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
        }
    }

    /// Creates a fresh slot in the accepting phase and returns its tag.
    pub fn insert_accepting(&self) -> RequestTag {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        let slot = RequestSlot {
            state: Lifecycle::Accepting,
            product_name: None,
            reply_tx: None,
        };
        self.slots.lock().insert(tag, slot);
        self.created.fetch_add(1, Ordering::Relaxed);
        tag
    }

    /// Attaches an arrived request to the accepting slot `tag` and returns
    /// the receiver on which the reply will be delivered.
    pub fn attach(&self, tag: RequestTag, product_name: String) -> Result<oneshot::Receiver<ProductReply>> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&tag).ok_or_else(|| Error::StaleTag {
            tag,
            context: "attach on unknown slot".to_string(),
        })?;

        if slot.state != Lifecycle::Accepting || slot.reply_tx.is_some() {
            return Err(Error::StaleTag {
                tag,
                context: format!("attach on {} slot", slot.state),
            });
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        slot.product_name = Some(product_name);
        slot.reply_tx = Some(reply_tx);
        Ok(reply_rx)
    }

    /// Advances the slot `tag` for one dequeued work item.
    ///
    /// An accepting slot with a request attached moves to dispatching; a
    /// finishing slot is handed back for destruction. Anything else is a
    /// stale or malformed event and is rejected.
    pub fn begin_resume(&self, tag: RequestTag) -> Result<Resumption> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&tag).ok_or_else(|| Error::StaleTag {
            tag,
            context: "resume on unknown slot".to_string(),
        })?;

        match slot.state {
            Lifecycle::Accepting => {
                let product_name = slot.product_name.clone().ok_or_else(|| Error::StaleTag {
                    tag,
                    context: "resume on accepting slot with no request attached".to_string(),
                })?;
                slot.state = Lifecycle::Dispatching;
                Ok(Resumption::Dispatch { product_name })
            }
            Lifecycle::Dispatching => Err(Error::StaleTag {
                tag,
                context: "duplicate resume on dispatching slot".to_string(),
            }),
            Lifecycle::Finishing => Ok(Resumption::Destroy),
        }
    }

    /// Completes the RPC for a dispatching slot: sends the reply through
    /// the stored sender and moves the slot to finishing.
    pub fn complete(&self, tag: RequestTag, reply: ProductReply) -> Result<Delivery> {
        let reply_tx = {
            let mut slots = self.slots.lock();
            let slot = slots.get_mut(&tag).ok_or_else(|| Error::StaleTag {
                tag,
                context: "complete on unknown slot".to_string(),
            })?;

            if slot.state != Lifecycle::Dispatching {
                return Err(Error::StaleTag {
                    tag,
                    context: format!("complete on {} slot", slot.state),
                });
            }

            slot.state = Lifecycle::Finishing;
            slot.reply_tx.take().ok_or_else(|| Error::StaleTag {
                tag,
                context: "complete on slot with no reply channel".to_string(),
            })?
        };

        match reply_tx.send(reply) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(_) => Ok(Delivery::Abandoned),
        }
    }

    /// Removes a finishing slot from the registry.
    pub fn destroy(&self, tag: RequestTag) -> Result<()> {
        let mut slots = self.slots.lock();
        let state = slots
            .get(&tag)
            .map(|slot| slot.state)
            .ok_or_else(|| Error::StaleTag {
                tag,
                context: "destroy on unknown slot".to_string(),
            })?;

        if state != Lifecycle::Finishing {
            return Err(Error::StaleTag {
                tag,
                context: format!("destroy on {} slot", state),
            });
        }

        slots.remove(&tag);
        self.destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Removes an accepting slot whose tag could not be published to the
    /// accept mailbox (service teardown). Keeps the counters balanced.
    pub fn abort_accepting(&self, tag: RequestTag) -> Result<()> {
        let mut slots = self.slots.lock();
        match slots.get(&tag).map(|slot| slot.state) {
            Some(Lifecycle::Accepting) => {
                slots.remove(&tag);
                self.destroyed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Some(state) => Err(Error::StaleTag {
                tag,
                context: format!("abort on {} slot", state),
            }),
            None => Err(Error::StaleTag {
                tag,
                context: "abort on unknown slot".to_string(),
            }),
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            live: self.slots.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_tonic_core::proto::ProductInfo;

    #[tokio::test]
    async fn full_lifecycle_delivers_reply_and_destroys_once() {
        let registry = RequestRegistry::new();

        let tag = registry.insert_accepting();
        let reply_rx = registry.attach(tag, "widget".to_string()).unwrap();

        match registry.begin_resume(tag).unwrap() {
            Resumption::Dispatch { product_name } => assert_eq!(product_name, "widget"),
            other => panic!("expected dispatch, got {other:?}"),
        }

        let reply = ProductReply {
            products: vec![ProductInfo {
                price: 10.0,
                vendor_id: "vendorA".to_string(),
            }],
        };
        assert_eq!(registry.complete(tag, reply).unwrap(), Delivery::Delivered);

        let received = reply_rx.await.unwrap();
        assert_eq!(received.products.len(), 1);

        match registry.begin_resume(tag).unwrap() {
            Resumption::Destroy => {}
            other => panic!("expected destroy, got {other:?}"),
        }
        registry.destroy(tag).unwrap();

        // The slot is gone: any further event for this tag is stale.
        assert!(registry.begin_resume(tag).is_err());
        assert!(registry.destroy(tag).is_err());

        let stats = registry.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.live, 0);
    }

    #[test]
    fn attach_on_unknown_tag_is_stale() {
        let registry = RequestRegistry::new();
        assert!(registry.attach(99, "widget".to_string()).is_err());
    }

    #[test]
    fn resume_without_attached_request_is_rejected() {
        let registry = RequestRegistry::new();
        let tag = registry.insert_accepting();
        assert!(registry.begin_resume(tag).is_err());
    }

    #[test]
    fn duplicate_dispatch_resume_is_rejected() {
        let registry = RequestRegistry::new();
        let tag = registry.insert_accepting();
        let _reply_rx = registry.attach(tag, "widget".to_string()).unwrap();

        assert!(matches!(
            registry.begin_resume(tag).unwrap(),
            Resumption::Dispatch { .. }
        ));
        assert!(registry.begin_resume(tag).is_err());
    }

    #[test]
    fn abandoned_client_is_detected_on_complete() {
        let registry = RequestRegistry::new();
        let tag = registry.insert_accepting();
        let reply_rx = registry.attach(tag, "widget".to_string()).unwrap();
        let _ = registry.begin_resume(tag).unwrap();

        drop(reply_rx);
        let delivery = registry
            .complete(tag, ProductReply { products: vec![] })
            .unwrap();
        assert_eq!(delivery, Delivery::Abandoned);

        // The slot reached finishing, so the worker can still destroy it.
        registry.destroy(tag).unwrap();
        let stats = registry.stats();
        assert_eq!(stats.created, stats.destroyed);
    }

    #[test]
    fn abort_accepting_balances_counters() {
        let registry = RequestRegistry::new();
        let tag = registry.insert_accepting();
        registry.abort_accepting(tag).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.live, 0);
    }
}
