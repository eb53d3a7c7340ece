//! Actor construction and task supervision
//!
//! [`ActorBuilder`] assembles a participant; [`Actor::stop`] cancels its
//! token and joins the receive loop and periodic tasks. In-flight task
//! bodies are allowed to complete.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use mirage_bus::{BusReceiver, CanBus};
use mirage_core::MirageResult;
use mirage_mtd::IdObfuscator;

use crate::{ActorContext, Received};

/// Handler invoked once per received frame, with the logical identifier
/// already recovered.
pub type FrameHandler<S> =
    dyn Fn(&Arc<ActorContext<S>>, &Received) -> MirageResult<()> + Send + Sync;

/// Body of a periodic broadcast task.
pub type PeriodicTask<S> = dyn Fn(&Arc<ActorContext<S>>) -> MirageResult<()> + Send + Sync;

/// Body of a one-shot delayed task.
pub type DelayedTask<S> = dyn FnOnce(&Arc<ActorContext<S>>) -> MirageResult<()> + Send;

/// Runtime tuning for one actor.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Bounded wait per receive call; the loop polls cancellation between
    /// waits.
    pub recv_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            recv_timeout: Duration::from_secs(1),
        }
    }
}

/// Builder for a bus participant.
pub struct ActorBuilder<S> {
    name: String,
    bus: CanBus,
    mtd: Arc<IdObfuscator>,
    state: S,
    config: NodeConfig,
    handler: Option<Box<FrameHandler<S>>>,
    periodic: Vec<(Duration, Box<PeriodicTask<S>>)>,
    delayed: Vec<(Duration, Box<DelayedTask<S>>)>,
}

impl<S: Send + 'static> ActorBuilder<S> {
    pub fn new(name: impl Into<String>, bus: CanBus, mtd: Arc<IdObfuscator>, state: S) -> Self {
        ActorBuilder {
            name: name.into(),
            bus,
            mtd,
            state,
            config: NodeConfig::default(),
            handler: None,
            periodic: Vec::new(),
            delayed: Vec::new(),
        }
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the frame handler. Without one the actor only runs its tasks.
    pub fn on_frame<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<ActorContext<S>>, &Received) -> MirageResult<()> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(f));
        self
    }

    /// Add a periodic task. The first run is immediate, then every
    /// `period`; the body reads current actor state on each run.
    pub fn every<F>(mut self, period: Duration, f: F) -> Self
    where
        F: Fn(&Arc<ActorContext<S>>) -> MirageResult<()> + Send + Sync + 'static,
    {
        self.periodic.push((period, Box::new(f)));
        self
    }

    /// Add a one-shot task fired once, `delay` after spawn.
    pub fn after<F>(mut self, delay: Duration, f: F) -> Self
    where
        F: FnOnce(&Arc<ActorContext<S>>) -> MirageResult<()> + Send + 'static,
    {
        self.delayed.push((delay, Box::new(f)));
        self
    }

    /// Subscribe to the bus and launch all of the actor's tasks.
    pub fn spawn(self) -> Actor<S> {
        let token = CancellationToken::new();
        // The actor attaches as its own participant: it never receives the
        // frames it publishes itself.
        let bus = self.bus.endpoint();
        let cx = Arc::new(ActorContext::new(
            self.name,
            bus.clone(),
            self.mtd,
            self.state,
            token,
        ));

        let mut tasks = Vec::new();

        if let Some(handler) = self.handler {
            // Subscribe before returning so no frame published after
            // spawn() can be missed.
            let rx = bus.subscribe();
            let loop_cx = Arc::clone(&cx);
            tasks.push(tokio::spawn(receive_loop(
                loop_cx,
                rx,
                handler,
                self.config.recv_timeout,
            )));
        }

        for (period, task) in self.periodic {
            let task_cx = Arc::clone(&cx);
            tasks.push(tokio::spawn(periodic_loop(task_cx, period, task)));
        }

        for (delay, task) in self.delayed {
            cx.schedule(delay, task);
        }

        Actor { cx, tasks }
    }
}

/// A running bus participant.
pub struct Actor<S> {
    cx: Arc<ActorContext<S>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: Send + 'static> Actor<S> {
    /// The actor's shared context, e.g. for inspecting state.
    pub fn context(&self) -> &Arc<ActorContext<S>> {
        &self.cx
    }

    pub fn is_stopped(&self) -> bool {
        self.cx.is_stopped()
    }

    /// Cancel the receive loop and all tasks, then wait for them to wind
    /// down. Pending delayed tasks are dropped; in-flight bodies finish.
    pub async fn stop(mut self) {
        self.cx.token().cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

async fn receive_loop<S: Send + 'static>(
    cx: Arc<ActorContext<S>>,
    mut rx: BusReceiver,
    handler: Box<FrameHandler<S>>,
    recv_timeout: Duration,
) {
    loop {
        tokio::select! {
            _ = cx.token().cancelled() => break,
            res = rx.recv(recv_timeout) => match res {
                Ok(Some(msg)) => {
                    let received = Received {
                        id: cx.mtd().deobfuscate(msg.frame.id()),
                        frame: msg.frame,
                        arrived_at: msg.arrived_at,
                    };
                    if let Err(e) = handler(&cx, &received) {
                        tracing::warn!(actor = %cx.name(), error = %e, "frame handler failed");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(actor = %cx.name(), error = %e, "bus receive failed, stopping");
                    break;
                }
            }
        }
    }
}

async fn periodic_loop<S: Send + 'static>(
    cx: Arc<ActorContext<S>>,
    period: Duration,
    task: Box<PeriodicTask<S>>,
) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cx.token().cancelled() => break,
            _ = ticks.tick() => {
                if let Err(e) = task(&cx) {
                    tracing::warn!(actor = %cx.name(), error = %e, "periodic task failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{CanId, FixedClock};
    use mirage_mtd::MtdConfig;
    use mirage_wire::Frame;

    fn test_mtd() -> Arc<IdObfuscator> {
        let config = MtdConfig::default();
        // Avoid seconds whose mask would alias the IDs used below onto the
        // exempt control channel; those frames would be unrecoverable.
        let generator = mirage_mtd::MaskGenerator::new(&config.key);
        let second = (0..mirage_core::SECONDS_PER_HOUR)
            .find(|sec| {
                let mask = generator.mask_for_second(*sec);
                mask != 0 && CanId::BATTERY.xor(mask) != CanId::CONTROL
            })
            .unwrap();
        Arc::new(IdObfuscator::new(config, Arc::new(FixedClock::new(second))))
    }

    #[tokio::test]
    async fn test_handler_sees_logical_id() {
        let bus = CanBus::new(16);
        let mtd = test_mtd();

        let actor = ActorBuilder::new("probe", bus.clone(), Arc::clone(&mtd), Vec::new())
            .on_frame(|cx, received| {
                cx.state().push((received.id, received.payload().to_vec()));
                Ok(())
            })
            .spawn();

        // Publish through the same obfuscator, as a peer would.
        let wire_id = mtd.obfuscate(CanId::BATTERY);
        bus.publish(&Frame::new(wire_id, &[0xB1, 0x55, 0x8F, 0x01]).unwrap());

        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let seen = actor.context().state();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].0, CanId::BATTERY);
            assert_eq!(seen[0].1, vec![0xB1, 0x55, 0x8F, 0x01]);
        }
        actor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_task_reads_live_state() {
        let bus = CanBus::new(64);
        let mut rx = bus.subscribe();

        let actor = ActorBuilder::new("beacon", bus.clone(), test_mtd(), 0u8)
            .every(Duration::from_secs(1), |cx| {
                let mut counter = cx.state();
                *counter += 1;
                cx.publish(CanId::HEADLAMP_STATUS, &[*counter])
            })
            .spawn();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        // Immediate first tick plus one per second: payloads 1..=4.
        for expected in 1..=4u8 {
            let msg = rx
                .recv(Duration::from_millis(100))
                .await
                .unwrap()
                .expect("broadcast expected");
            assert_eq!(msg.frame.payload(), &[expected]);
        }

        actor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_task_fires_once() {
        let bus = CanBus::new(16);
        let mut rx = bus.subscribe();

        let actor = ActorBuilder::new("latch", bus.clone(), test_mtd(), ())
            .after(Duration::from_secs(2), |cx| {
                cx.publish(CanId::CONTROL, &[0x07])
            })
            .spawn();

        // Nothing before the delay elapses.
        assert!(rx.recv(Duration::from_millis(1500)).await.unwrap().is_none());

        let msg = rx
            .recv(Duration::from_secs(1))
            .await
            .unwrap()
            .expect("delayed frame expected");
        assert_eq!(msg.frame.id(), CanId::CONTROL);

        // Once only.
        assert!(rx.recv(Duration::from_secs(5)).await.unwrap().is_none());
        actor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_tasks() {
        let bus = CanBus::new(16);
        let mut rx = bus.subscribe();

        let actor = ActorBuilder::new("doomed", bus.clone(), test_mtd(), ())
            .every(Duration::from_secs(10), |_cx| Ok(()))
            .after(Duration::from_secs(5), |cx| {
                cx.publish(CanId::CONTROL, &[0x03])
            })
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        actor.stop().await;

        // The 5s one-shot was cancelled with the actor.
        assert!(rx.recv(Duration::from_secs(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_runtime_scheduled_task_runs() {
        let bus = CanBus::new(16);

        let actor = ActorBuilder::new("scheduler", bus.clone(), test_mtd(), 0u32).spawn();

        actor.context().schedule(Duration::from_millis(10), |cx| {
            *cx.state() += 1;
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*actor.context().state(), 1);
        actor.stop().await;
    }
}
