//! # Labdesk Core
//!
//! Core traits and types shared by the labdesk crates.
//!
//! Business rules that move a lab request through its lifecycle are written as
//! reducers: pure functions that mutate owned state and return descriptions of
//! the side effects to run afterwards. The imperative shell (services, HTTP
//! handlers) loads state from a repository, runs the reducer, persists the
//! result and then executes the returned effects.
//!
//! ## Core Concepts
//!
//! - **State**: The aggregate being changed (a lab request, for instance)
//! - **Action**: Every input a reducer understands
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: A side effect description, executed later by the caller
//! - **Environment**: Injected dependencies (clock, broadcaster, settings)
//!
//! ## Example
//!
//! ```ignore
//! use labdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for RequestReducer {
//!     type State = RequestState;
//!     type Action = RequestAction;
//!     type Environment = RequestEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut RequestState,
//!         action: RequestAction,
//!         env: &RequestEnvironment,
//!     ) -> SmallVec<[Effect<RequestAction>; 4]> {
//!         match action {
//!             RequestAction::Approve { .. } => {
//!                 state.request.status = RequestStatus::Approved;
//!                 smallvec![Effect::None]
//!             }
//!             _ => SmallVec::new(),
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the trait every state machine implements.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// A reducer validates an action against the current state, updates the
    /// state in place and returns the effects to run once the new state has
    /// been persisted. It never performs I/O itself.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions and their execution.
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed when a reducer returns them. The caller decides
    /// when to run them, typically right after the state they describe has been
    /// written to storage.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is handed back to the
        /// caller so it can be fed into the reducer again.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns `true` for `Effect::None`.
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Execute the effect tree and collect the actions it produced.
        ///
        /// Sequential children run in order, parallel children are joined.
        /// Produced actions are returned in completion order for sequential
        /// effects and in declaration order for parallel ones.
        pub fn run(self) -> BoxFuture<'static, Vec<Action>> {
            Box::pin(async move {
                match self {
                    Effect::None => Vec::new(),
                    Effect::Future(fut) => fut.await.into_iter().collect(),
                    Effect::Sequential(effects) => {
                        let mut actions = Vec::new();
                        for effect in effects {
                            actions.extend(effect.run().await);
                        }
                        actions
                    },
                    Effect::Parallel(effects) => {
                        futures::future::join_all(effects.into_iter().map(Effect::run))
                            .await
                            .into_iter()
                            .flatten()
                            .collect()
                    },
                }
            })
        }
    }

    /// Execute a batch of effects returned by one `reduce` call.
    pub async fn run_all<Action, I>(effects: I) -> Vec<Action>
    where
        Action: Send + 'static,
        I: IntoIterator<Item = Effect<Action>>,
    {
        Effect::Sequential(effects.into_iter().collect()).run().await
    }
}

/// Environment module - dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Request expiration is computed against this clock, so tests can move
    /// time forward without sleeping.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{run_all, Effect};

    #[tokio::test]
    async fn none_produces_no_actions() {
        let actions: Vec<u8> = Effect::None.run().await;
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn sequential_effects_keep_order() {
        let effect = Effect::chain(vec![
            Effect::Future(Box::pin(async { Some(1) })),
            Effect::None,
            Effect::Future(Box::pin(async { Some(2) })),
        ]);

        assert_eq!(effect.run().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn parallel_effects_collect_every_action() {
        let effect = Effect::merge(vec![
            Effect::Future(Box::pin(async { Some("a") })),
            Effect::Future(Box::pin(async { None })),
            Effect::Future(Box::pin(async { Some("b") })),
        ]);

        assert_eq!(effect.run().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn run_all_flattens_batches() {
        let actions = run_all(vec![
            Effect::Future(Box::pin(async { Some(3) })),
            Effect::merge(vec![Effect::Future(Box::pin(async { Some(4) }))]),
        ])
        .await;

        assert_eq!(actions, vec![3, 4]);
    }

    #[test]
    fn debug_hides_future_internals() {
        let effect: Effect<u8> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
