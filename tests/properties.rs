//! Property tests: the registry against a simple ordered model.

use event_registry::{Listener, Registry, Subscribable, SubscriptionId};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Op {
    Subscribe { once: bool },
    /// Remove the n-th (mod len) subscription ever created, live or not.
    UnsubscribeById(usize),
    /// Remove by target + channel + id.
    UnsubscribeByTarget(usize),
    Dispatch,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|once| Op::Subscribe { once }),
        2 => any::<usize>().prop_map(Op::UnsubscribeById),
        1 => any::<usize>().prop_map(Op::UnsubscribeByTarget),
        2 => Just(Op::Dispatch),
    ]
}

proptest! {
    #[test]
    fn ids_are_strictly_increasing(count in 1usize..200) {
        let registry = Registry::new();
        let target = Subscribable::new();
        let listener = Listener::new(|_, _, _| Ok(()));

        let ids: Vec<SubscriptionId> = (0..count)
            .map(|i| registry.subscribe(&target, i as i64 % 3, listener.clone(), Value::Null))
            .collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let registry = Registry::new();
        let target = Subscribable::new();
        let fired = Arc::new(Mutex::new(Vec::new()));

        // Model: (id, once) of live subscriptions in insertion order.
        let mut live: Vec<(SubscriptionId, bool)> = Vec::new();
        let mut created: Vec<SubscriptionId> = Vec::new();

        for op in ops {
            match op {
                Op::Subscribe { once } => {
                    let sink = Arc::clone(&fired);
                    let own = Arc::new(Mutex::new(None));
                    let slot = Arc::clone(&own);
                    let listener = Listener::new(move |_, _, _| {
                        if let Some(id) = *slot.lock() {
                            sink.lock().push(id);
                        }
                        Ok(())
                    });
                    let id = registry.subscribe_with(&target, "x", listener, Value::Null, once);
                    *own.lock() = Some(id);
                    live.push((id, once));
                    created.push(id);
                }
                Op::UnsubscribeById(n) | Op::UnsubscribeByTarget(n) if created.is_empty() => {
                    let _ = n;
                }
                Op::UnsubscribeById(n) => {
                    let id = created[n % created.len()];
                    let expected = live.iter().position(|(l, _)| *l == id);
                    prop_assert_eq!(registry.unsubscribe_by_id(id), expected.is_some());
                    if let Some(pos) = expected {
                        live.remove(pos);
                    }
                }
                Op::UnsubscribeByTarget(n) => {
                    let id = created[n % created.len()];
                    let expected = live.iter().position(|(l, _)| *l == id);
                    prop_assert_eq!(
                        registry.unsubscribe_by_target(&target, "x", id),
                        expected.is_some()
                    );
                    if let Some(pos) = expected {
                        live.remove(pos);
                    }
                }
                Op::Dispatch => {
                    fired.lock().clear();
                    let invoked = registry.dispatch(&target, "x", &Value::Null).unwrap();
                    let expected: Vec<SubscriptionId> = live.iter().map(|(id, _)| *id).collect();
                    prop_assert_eq!(invoked, expected.len());
                    prop_assert_eq!(&*fired.lock(), &expected);
                    live.retain(|(_, once)| !once);
                }
            }

            prop_assert_eq!(target.listener_count("x"), live.len());
            prop_assert_eq!(registry.subscription_count(), live.len());
        }
    }
}
