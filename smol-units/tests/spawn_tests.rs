/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![allow(dead_code, unused_doc_comments)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smol_test::prelude::*;
use smol_units::prelude::*;

use crate::setup::initialize_tracing;
use crate::setup::units::recorder::Recorder;

mod setup;

fn registry() -> Registry {
    Registry::with_config(SmolConfig::default())
}

/// Spawns a `child` on request and reports the new ref's name back to the sender.
struct Spawner {
    child: Recorder,
}

#[async_trait]
impl Unit for Spawner {
    async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()> {
        let Some(name) = message.as_text() else {
            return Err(MessageError::Unsupported(message.kind().to_string()).into());
        };
        let child = self.child.clone();
        let child_ref = ctx.spawn(name, move || child).await;
        child_ref.send_as(&ctx.self_ref(), "welcome");
        from.send_as(&ctx.self_ref(), child_ref.name());
        Ok(())
    }
}

/// Spawning a new name creates, initializes and registers the unit.
#[smol_test(timeout_ms = 5_000)]
async fn spawn_creates_and_initializes() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    registry.register("host", Arc::new(Recorder::default()));
    registry.start().await?;
    assert_eq!(registry.len(), 1);

    let child = Recorder::default();
    let ctx = registry.context_for("host").expect("host is registered");
    let factory_child = child.clone();
    let child_ref = ctx.spawn("child", move || factory_child).await;

    assert_eq!(child_ref.name(), "child");
    assert_eq!(child.inits(), 1);
    assert_eq!(child.init_bound_to().as_deref(), Some("child"));
    assert_eq!(registry.len(), 2);
    assert!(registry.units().iter().any(|desc| desc.name == "child"));
    assert!(registry.get_ref("child").is_some_and(|r| r.same_ref(&child_ref)));

    child_ref.send("hi");
    registry.quiesce().await;
    assert_eq!(child.texts(), vec!["hi".to_string()]);
    Ok(())
}

/// Spawning a live name returns the existing ref and never calls the factory.
#[smol_test(timeout_ms = 5_000)]
async fn spawn_existing_name_returns_existing_ref() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    let existing = Recorder::default();
    let existing_ref = registry.register("taken", Arc::new(existing.clone()));
    registry.start().await?;

    let ctx = registry.context_for("taken").expect("taken is registered");
    let spawned: UnitRef = ctx
        .spawn("taken", || -> Recorder { unreachable!("factory must not run for a live name") })
        .await;

    assert!(spawned.same_ref(&existing_ref));
    assert_eq!(existing.inits(), 1);
    assert_eq!(registry.len(), 1);
    Ok(())
}

/// Concurrent spawns of one name construct the unit exactly once and all get working refs.
///
/// **Scenario:**
/// 1. Sixteen tasks spawn `"x"` at the same time through a counting factory.
/// 2. Each task sends one message through the ref it got back.
///
/// **Verification:**
/// - The factory ran once, the unit was initialized once.
/// - All sixteen messages land on that single instance.
#[smol_test(timeout_ms = 5_000)]
async fn concurrent_spawn_constructs_once() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    registry.register("host", Arc::new(Recorder::default()));
    registry.start().await?;

    let constructed = Arc::new(AtomicUsize::new(0));
    let instance = Recorder::default();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ctx = registry.context_for("host").expect("host is registered");
            let constructed = constructed.clone();
            let instance = instance.clone();
            tokio::spawn(async move {
                let unit_ref = ctx
                    .spawn("x", move || {
                        constructed.fetch_add(1, Ordering::SeqCst);
                        instance
                    })
                    .await;
                unit_ref.send(format!("from task {i}"));
                unit_ref
            })
        })
        .collect();

    let mut refs = Vec::with_capacity(handles.len());
    for handle in handles {
        refs.push(handle.await?);
    }
    registry.quiesce().await;

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(eventually(std::time::Duration::from_secs(1), || instance.inits() == 1).await);
    assert!(refs.iter().all(|r| r.name() == "x"));
    assert_eq!(instance.count(), 16);
    assert_eq!(registry.len(), 2);
    Ok(())
}

/// A handler can spawn a unit and message it within the same invocation.
#[smol_test(timeout_ms = 5_000)]
async fn spawn_from_inside_a_handler() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    let child = Recorder::default();
    let caller = Recorder::default();
    let spawner_ref = registry.register(
        "spawner",
        Arc::new(Spawner {
            child: child.clone(),
        }),
    );
    let caller_ref = registry.register("caller", Arc::new(caller.clone()));
    registry.start().await?;

    spawner_ref.send_as(&caller_ref, "worker");
    registry.quiesce().await;

    assert_eq!(caller.texts(), vec!["worker".to_string()]);
    assert_eq!(child.inits(), 1);
    let welcome = child.deliveries();
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0].from.name(), "spawner");
    assert!(registry.get_ref("worker").is_some());
    Ok(())
}

/// A spawn factory may call back into the registry: look things up, list units, and
/// register a unit of its own.
///
/// **Scenario:**
/// 1. Spawn `"parent"` with a factory that reads `len`, lists units and registers `"sidecar"`.
/// 2. Bound the whole spawn by a short timeout.
///
/// **Verification:**
/// - The spawn completes, the factory saw the directory as it was, and both units are live.
#[smol_test(timeout_ms = 5_000)]
async fn factory_may_use_the_registry() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    registry.register("host", Arc::new(Recorder::default()));
    registry.start().await?;

    let seen = Arc::new(AtomicUsize::new(0));
    let sidecar = Recorder::default();
    let ctx = registry.context_for("host").expect("host is registered");
    let inside = registry.clone();
    let factory_seen = seen.clone();
    let factory_sidecar = sidecar.clone();

    let parent_ref = tokio::time::timeout(
        std::time::Duration::from_millis(500),
        ctx.spawn("parent", move || {
            factory_seen.store(inside.len(), Ordering::SeqCst);
            assert!(inside.get_ref("host").is_some());
            assert!(inside.units().iter().all(|desc| desc.name != "parent"));
            inside.register("sidecar", Arc::new(factory_sidecar));
            Recorder::default()
        }),
    )
    .await?;

    assert_eq!(parent_ref.name(), "parent");
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 3);

    registry
        .get_ref("sidecar")
        .expect("sidecar registered by the factory")
        .send("hello");
    registry.quiesce().await;
    assert_eq!(sidecar.texts(), vec!["hello".to_string()]);
    Ok(())
}

/// A factory running for one name does not hold up spawns of other names.
#[smol_test(timeout_ms = 5_000)]
async fn slow_factory_does_not_block_other_names() -> anyhow::Result<()> {
    initialize_tracing();
    let registry = registry();
    registry.register("host", Arc::new(Recorder::default()));

    let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let slow = {
        let ctx = registry.context_for("host").expect("host is registered");
        tokio::task::spawn_blocking(move || {
            tokio::runtime::Handle::current().block_on(ctx.spawn("slow", move || {
                entered_tx.send(()).expect("test is waiting");
                release_rx.recv().expect("test releases the factory");
                Recorder::default()
            }))
        })
    };
    tokio::task::spawn_blocking(move || entered_rx.recv()).await??;

    let ctx = registry.context_for("host").expect("host is registered");
    let quick = tokio::time::timeout(
        std::time::Duration::from_millis(500),
        ctx.spawn("quick", Recorder::default),
    )
    .await?;
    assert_eq!(quick.name(), "quick");
    assert!(registry.get_ref("slow").is_none());

    release_tx.send(())?;
    let slow_ref = slow.await?;
    assert_eq!(slow_ref.name(), "slow");
    assert_eq!(registry.len(), 3);
    Ok(())
}
