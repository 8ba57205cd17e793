//=========================================================================
// Input Manager
//
// Owns the device set, the polling worker and the event queue/dispatch
// pipeline.
//
// Architecture:
// ```text
//  Polling Worker:                       Logic Tick:
//  ┌────────────────────────────┐       ┌──────────────────────┐
//  │ lock(devices)              │       │ process_events()     │
//  │   device.poll(&mut buffer) │       │   lock(queue)        │
//  │ unlock(devices)            │       │   filter (vkbd)      │
//  │ lock(queue)                │       │   listeners by prio  │
//  │   validate + append buffer │──────▶│   clear              │
//  │ unlock(queue)              │       │   unlock(queue)      │
//  └────────────────────────────┘       └──────────────────────┘
//          ▲ push_*() from any thread ──┘
// ```
//
// Lock Domains:
// - device lock: `register_device`, `unregister_device`, one poll iteration
// - event lock:  every push, `process_events`, listener add/remove
// The two are never held at the same time. The lifecycle lock (worker
// handle) is only taken by `initialize`/`shutdown` and may wrap either.
//
// Lifecycle:
//   Uninitialized ──initialize()──▶ Running ──shutdown()──▶ Uninitialized
//   shutdown: stop signal → join worker → destroy devices → clear queue
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use glam::Vec2;
use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::device::{same_device, InputDevice};
use super::event::{EventBuffer, InputEvent};
use super::event_queue::{EventQueue, InputListener, ListenerId};
use super::handle::{AxisHandle, KeyHandle};
use super::registry::KeyRegistry;
use super::virtual_keyboard::VirtualKeyboard;
use crate::core::error::{InputError, InputResult};
use crate::core::lock;

//=== Defaults ============================================================

const DEFAULT_THREAD_NAME: &str = "Input Management Thread";
const DEFAULT_EVENT_CAPACITY: usize = 64;

type DeviceList = Vec<Arc<dyn InputDevice>>;

//=== InputManagerBuilder =================================================

/// Builder for configuring and constructing an [`InputManager`].
///
/// # Default Values
///
/// - **Poll interval**: `0` (continuous polling, yields between iterations)
/// - **Thread name**: `"Input Management Thread"`
/// - **Event capacity**: 64 pre-allocated queue slots
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use aetheric_input::prelude::*;
///
/// let keys = Arc::new(KeyRegistry::with_default_keys());
/// let manager = InputManagerBuilder::new(keys)
///     .with_poll_interval(Duration::from_millis(1))
///     .build();
///
/// assert!(!manager.is_initialized());
/// ```
pub struct InputManagerBuilder {
    keys: Arc<KeyRegistry>,
    poll_interval: Duration,
    thread_name: String,
    event_capacity: usize,
}

impl InputManagerBuilder {
    /// Creates a builder validating key events against `keys`.
    pub fn new(keys: Arc<KeyRegistry>) -> Self {
        Self {
            keys,
            poll_interval: Duration::ZERO,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the pause between two poll iterations.
    ///
    /// `Duration::ZERO` polls continuously; CPU use is then bounded only by
    /// the cost of the devices' `poll`. A non-zero interval is waited on the
    /// stop channel, so shutdown is never delayed by it.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the OS name of the polling thread.
    pub fn with_thread_name(mut self, name: &str) -> Self {
        self.thread_name = name.to_owned();
        self
    }

    /// Sets how many events the queue and the worker buffer pre-allocate.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Event capacity must be positive");
        self.event_capacity = capacity;
        self
    }

    /// Builds an uninitialized manager.
    pub fn build(self) -> InputManager {
        debug!(
            target: "input_manager",
            "Building input manager (poll interval: {:?}, capacity: {})",
            self.poll_interval,
            self.event_capacity
        );

        InputManager {
            shared: Arc::new(Shared {
                keys: self.keys,
                queue: Mutex::new(EventQueue::with_capacity(self.event_capacity)),
            }),
            devices: Arc::new(Mutex::new(Vec::new())),
            worker: Mutex::new(None),
            poll_interval: self.poll_interval,
            thread_name: self.thread_name,
            event_capacity: self.event_capacity,
        }
    }
}

//=== Shared ==============================================================

/// Event domain shared between the manager and its polling worker.
struct Shared {
    /// Frozen after setup; read without locking.
    keys: Arc<KeyRegistry>,
    queue: Mutex<EventQueue>,
}

impl Shared {
    /// Key events for unregistered handles are dropped with a warning.
    fn accepts(&self, event: &InputEvent) -> bool {
        match event {
            InputEvent::KeyStateChange { key, .. } if !self.keys.has_handle(*key) => {
                warn!(
                    target: "input_manager",
                    "Can't push key state change: key handle {:08x} is not part of the key registry!",
                    key.raw()
                );
                false
            }
            _ => true,
        }
    }

    fn push(&self, event: InputEvent) {
        if self.accepts(&event) {
            lock(&self.queue).push(event);
        }
    }

    /// Appends a whole poll iteration under one lock acquisition.
    fn push_batch(&self, buffer: &mut EventBuffer) {
        let mut queue = lock(&self.queue);
        for event in buffer.drain() {
            if self.accepts(&event) {
                queue.push(event);
            }
        }
    }
}

//=== Worker ==============================================================

/// Running polling thread and the channel used to stop it.
struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Poll loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollControl {
    Continue,
    Exit,
}

//=== InputManager ========================================================

/// Collects events from devices on a background thread and dispatches
/// them to listeners once per logic tick.
///
/// Every method takes `&self`; share the manager through an `Arc` when
/// platform code on other threads needs the push API.
///
/// # Threading
///
/// - Any thread may push events or (un)register devices.
/// - Exactly one thread should call [`process_events`](Self::process_events).
/// - Listeners run while the event lock is held: they must not push
///   events or add/remove listeners on the same manager.
pub struct InputManager {
    shared: Arc<Shared>,
    devices: Arc<Mutex<DeviceList>>,
    worker: Mutex<Option<Worker>>,
    poll_interval: Duration,
    thread_name: String,
    event_capacity: usize,
}

impl InputManager {
    //--- Construction -----------------------------------------------------

    /// Creates a manager with default settings. See [`InputManagerBuilder`].
    pub fn new(keys: Arc<KeyRegistry>) -> Self {
        InputManagerBuilder::new(keys).build()
    }

    /// Key registry used to validate key events.
    pub fn key_registry(&self) -> &KeyRegistry {
        &self.shared.keys
    }

    //--- Lifecycle --------------------------------------------------------

    /// Starts the polling worker.
    ///
    /// # Errors
    ///
    /// - [`InputError::AlreadyInitialized`] if the worker is already running.
    /// - [`InputError::WorkerSpawn`] if the thread could not be created; the
    ///   manager stays uninitialized.
    pub fn initialize(&self) -> InputResult<()> {
        let mut worker = lock(&self.worker);

        if worker.is_some() {
            warn!(target: "input_manager", "Input manager is already initialized");
            return Err(InputError::AlreadyInitialized);
        }

        debug!(target: "input_manager", "Initializing input manager...");
        debug!(target: "input_manager", "Creating input thread...");

        match self.spawn_worker() {
            Ok(spawned) => {
                *worker = Some(spawned);
                debug!(target: "input_manager", "Created input thread '{}'", self.thread_name);
                info!(target: "input_manager", "Initialized input manager!");
                Ok(())
            }
            Err(e) => {
                error!(target: "input_manager", "Failed to create input thread: {}", e);
                Err(InputError::WorkerSpawn(e))
            }
        }
    }

    /// Returns `true` while the polling worker is running.
    pub fn is_initialized(&self) -> bool {
        lock(&self.worker).is_some()
    }

    /// Stops the worker, tears down every device and clears the queue.
    ///
    /// The worker is joined before the first `destroy` call, so no device is
    /// polled once its teardown has begun. Blocks for as long as the current
    /// poll iteration takes. No-op if the manager is not initialized.
    pub fn shutdown(&self) {
        let mut lifecycle = lock(&self.worker);

        let Some(Worker { stop, handle }) = lifecycle.take() else {
            return;
        };

        debug!(target: "input_manager", "Shutting down the input manager...");
        debug!(target: "input_manager", "Shutting down the input thread...");

        // A full channel or a worker that already exited both mean "stopped".
        let _ = stop.try_send(());
        drop(stop);

        if handle.join().is_err() {
            error!(target: "input_manager", "Input thread panicked before shutdown");
        }

        debug!(target: "input_manager", "Destroying device resources...");
        let devices = std::mem::take(&mut *lock(&self.devices));
        for device in &devices {
            debug!(target: "input_manager", "Destroying resources for '{}'", device.name());
            device.destroy();
        }
        info!(target: "input_manager", "Destroyed device resources!");

        lock(&self.shared.queue).reset();
    }

    fn spawn_worker(&self) -> io::Result<Worker> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let devices = Arc::clone(&self.devices);
        let interval = self.poll_interval;
        let capacity = self.event_capacity;

        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || poll_loop(&shared, &devices, &stop_rx, interval, capacity))?;

        Ok(Worker {
            stop: stop_tx,
            handle,
        })
    }

    //--- Devices ----------------------------------------------------------

    /// Initializes `device` and adds it to the polled set.
    ///
    /// `initialize` runs under the device lock, so the device is never
    /// polled before it has been set up.
    ///
    /// # Errors
    ///
    /// - [`InputError::DeviceAlreadyRegistered`] if this allocation is
    ///   already registered; it is not initialized a second time.
    /// - [`InputError::DeviceInitialization`] if the device's own
    ///   `initialize` fails; the device is not registered.
    pub fn register_device(&self, device: Arc<dyn InputDevice>) -> InputResult<()> {
        let name = device.name();
        let mut devices = lock(&self.devices);

        if devices.iter().any(|d| same_device(d, &device)) {
            warn!(target: "input_manager", "Device '{}' is already registered!", name);
            return Err(InputError::DeviceAlreadyRegistered(name));
        }

        if !device.initialize() {
            error!(target: "input_manager", "Device '{}' failed to initialize", name);
            return Err(InputError::DeviceInitialization(name));
        }

        info!(
            target: "input_manager",
            "Registering device '{}' (player {})",
            name,
            device.player_id()
        );
        devices.push(device);

        Ok(())
    }

    /// Removes `device` from the polled set and tears it down.
    ///
    /// Returns `false` (and logs a warning) if the device was not
    /// registered; nothing else happens in that case.
    pub fn unregister_device(&self, device: &Arc<dyn InputDevice>) -> bool {
        let name = device.name();
        let mut devices = lock(&self.devices);

        debug!(target: "input_manager", "Unregistering device '{}'", name);

        match devices.iter().position(|d| same_device(d, device)) {
            Some(index) => {
                let removed = devices.remove(index);
                // Still under the device lock: the worker can't be mid-poll.
                removed.destroy();
                info!(target: "input_manager", "Device '{}' was destroyed successfully!", name);
                true
            }
            None => {
                warn!(
                    target: "input_manager",
                    "Device '{}' was not registered in the first place!",
                    name
                );
                false
            }
        }
    }

    /// Snapshot of the registered devices.
    pub fn devices(&self) -> Vec<Arc<dyn InputDevice>> {
        lock(&self.devices).clone()
    }

    //--- Push API ---------------------------------------------------------
    //
    // Meant for the device/platform layer and for simulation in tests.
    // Devices normally push through the `EventBuffer` handed to `poll`.
    //

    /// Queues a key state change; dropped if `key` is not registered.
    pub fn push_key_state_change(&self, key: KeyHandle, pressed: bool) {
        trace!(
            target: "input_manager",
            "Pushing key state change: {:?} {}",
            key,
            if pressed { "DOWN" } else { "UP" }
        );
        self.shared.push(InputEvent::KeyStateChange { key, pressed });
    }

    pub fn push_input_char(&self, ch: char) {
        self.shared.push(InputEvent::InputChar { ch });
    }

    pub fn push_axis_change(&self, axis: AxisHandle, value: f32) {
        trace!(target: "input_manager", "Pushing axis change for {:?}: {}", axis, value);
        self.shared.push(InputEvent::AxisChange { axis, value });
    }

    pub fn push_mouse_position(&self, position: Vec2) {
        self.shared.push(InputEvent::MousePosition { position });
    }

    pub fn push_touch_down(&self, finger: i32, position: Vec2) {
        self.shared.push(InputEvent::TouchDown { finger, position });
    }

    pub fn push_touch_move(&self, finger: i32, position: Vec2) {
        self.shared.push(InputEvent::TouchMove { finger, position });
    }

    pub fn push_touch_up(&self, finger: i32, position: Vec2) {
        self.shared.push(InputEvent::TouchUp { finger, position });
    }

    /// Number of events waiting for the next [`process_events`](Self::process_events).
    pub fn pending_events(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    //--- Dispatch ---------------------------------------------------------

    /// Dispatches every event pushed since the previous call, then clears
    /// the queue.
    ///
    /// Call once per logic tick from a single thread. Pushes from other
    /// threads block until the batch has been dispatched.
    pub fn process_events(&self) {
        lock(&self.shared.queue).dispatch();
    }

    //--- Listeners --------------------------------------------------------

    /// Registers a listener and returns the token needed to remove it.
    ///
    /// High-priority listeners go in front of every existing listener,
    /// others go last.
    pub fn add_input_listener<F>(&self, listener: F, high_priority: bool) -> ListenerId
    where
        F: FnMut(&InputEvent) -> bool + Send + 'static,
    {
        let boxed: InputListener = Box::new(listener);
        lock(&self.shared.queue).add_listener(boxed, high_priority)
    }

    /// Removes a listener. Returns `false` if the token was unknown.
    pub fn remove_input_listener(&self, id: ListenerId) -> bool {
        lock(&self.shared.queue).remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.shared.queue).listener_count()
    }

    /// Installs (or removes) the virtual keyboard consulted during dispatch.
    pub fn set_virtual_keyboard(&self, keyboard: Option<Arc<dyn VirtualKeyboard>>) {
        lock(&self.shared.queue).set_virtual_keyboard(keyboard);
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//=== Debug Trait =========================================================

impl fmt::Debug for InputManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let devices: Vec<_> = lock(&self.devices).iter().map(|d| d.name()).collect();

        f.debug_struct("InputManager")
            .field("initialized", &self.is_initialized())
            .field("devices", &devices)
            .field("queue", &*lock(&self.shared.queue))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

//=== Poll Loop ===========================================================

/// Body of the polling thread.
///
/// Each iteration polls every device into a local buffer under the device
/// lock, releases it, and only then appends the buffer to the queue.
fn poll_loop(
    shared: &Shared,
    devices: &Mutex<DeviceList>,
    stop: &Receiver<()>,
    interval: Duration,
    capacity: usize,
) {
    debug!(target: "input_worker", "Input thread started");
    let mut buffer = EventBuffer::with_capacity(capacity);

    loop {
        {
            let devices = lock(devices);
            for device in devices.iter() {
                poll_device(&**device, &mut buffer);
            }
        }

        if !buffer.is_empty() {
            shared.push_batch(&mut buffer);
        }

        if next_iteration(stop, interval) == PollControl::Exit {
            break;
        }
    }

    debug!(target: "input_worker", "Input thread exiting");
}

/// Polls one device, containing a panic so the worker survives it.
///
/// Events the device pushed before panicking are kept.
fn poll_device(device: &dyn InputDevice, buffer: &mut EventBuffer) {
    let polled = panic::catch_unwind(AssertUnwindSafe(|| device.poll(buffer)));

    if polled.is_err() {
        error!(
            target: "input_worker",
            "Device '{}' panicked while polling",
            device.name()
        );
    }
}

/// Waits out the poll interval, returning `Exit` once a stop is observed.
fn next_iteration(stop: &Receiver<()>, interval: Duration) -> PollControl {
    if interval.is_zero() {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {
                thread::yield_now();
                PollControl::Continue
            }
            Ok(()) | Err(TryRecvError::Disconnected) => PollControl::Exit,
        }
    } else {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => PollControl::Continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => PollControl::Exit,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    //--- Test Helpers -----------------------------------------------------

    /// Device double counting calls and flagging polls after teardown.
    #[derive(Default)]
    struct CountingDevice {
        polls: AtomicUsize,
        destroys: AtomicUsize,
        destroyed: AtomicBool,
        polled_after_destroy: AtomicBool,
        inits: AtomicUsize,
        fail_init: bool,
    }

    impl InputDevice for CountingDevice {
        fn initialize(&self) -> bool {
            self.inits.fetch_add(1, Ordering::SeqCst);
            !self.fail_init
        }

        fn destroy(&self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
            self.destroyed.store(true, Ordering::SeqCst);
        }

        fn poll(&self, _events: &mut EventBuffer) {
            if self.destroyed.load(Ordering::SeqCst) {
                self.polled_after_destroy.store(true, Ordering::SeqCst);
            }
            self.polls.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> String {
            "counter".to_owned()
        }

        fn player_id(&self) -> i32 {
            0
        }
    }

    fn keys() -> Arc<KeyRegistry> {
        Arc::new(KeyRegistry::with_default_keys())
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    fn counting_device() -> (Arc<CountingDevice>, Arc<dyn InputDevice>) {
        let stats = Arc::new(CountingDevice::default());
        let device: Arc<dyn InputDevice> = stats.clone();
        (stats, device)
    }

    //=====================================================================
    // Builder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = InputManagerBuilder::new(keys());
        assert_eq!(builder.poll_interval, Duration::ZERO);
        assert_eq!(builder.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(builder.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    #[should_panic(expected = "Event capacity must be positive")]
    fn builder_rejects_zero_capacity() {
        InputManagerBuilder::new(keys()).with_event_capacity(0);
    }

    //=====================================================================
    // Lifecycle Tests
    //=====================================================================

    #[test]
    fn initialize_and_shutdown() {
        let manager = InputManager::new(keys());
        assert!(!manager.is_initialized());

        manager.initialize().unwrap();
        assert!(manager.is_initialized());

        manager.shutdown();
        assert!(!manager.is_initialized());
    }

    #[test]
    fn double_initialize_is_rejected() {
        let manager = InputManager::new(keys());
        manager.initialize().unwrap();

        assert!(matches!(manager.initialize(), Err(InputError::AlreadyInitialized)));
        manager.shutdown();
    }

    /// Shutdown without initialize leaves devices and listeners alone.
    #[test]
    fn shutdown_without_initialize_is_noop() {
        let manager = InputManager::new(keys());
        let (stats, device) = counting_device();
        manager.register_device(device).unwrap();
        manager.add_input_listener(|_| false, false);

        manager.shutdown();

        assert_eq!(stats.destroys.load(Ordering::SeqCst), 0);
        assert_eq!(manager.devices().len(), 1);
        assert_eq!(manager.listener_count(), 1);
    }

    /// The worker is joined before any device teardown runs.
    #[test]
    fn shutdown_joins_before_teardown() {
        let manager = InputManager::new(keys());
        let (stats, device) = counting_device();
        manager.register_device(device).unwrap();
        manager.initialize().unwrap();

        assert!(wait_until(|| stats.polls.load(Ordering::SeqCst) > 0));
        manager.shutdown();

        let polls_at_shutdown = stats.polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
        assert!(!stats.polled_after_destroy.load(Ordering::SeqCst));
        assert_eq!(stats.polls.load(Ordering::SeqCst), polls_at_shutdown);
        assert!(manager.devices().is_empty());
        assert_eq!(manager.listener_count(), 0);
    }

    #[test]
    fn manager_can_restart_after_shutdown() {
        let manager = InputManager::new(keys());
        manager.initialize().unwrap();
        manager.shutdown();

        manager.initialize().unwrap();
        assert!(manager.is_initialized());
    }

    /// A long poll interval does not delay shutdown.
    #[test]
    fn shutdown_wakes_sleeping_worker() {
        let manager = InputManagerBuilder::new(keys())
            .with_poll_interval(Duration::from_secs(60))
            .build();
        manager.initialize().unwrap();

        let started = Instant::now();
        manager.shutdown();

        assert!(started.elapsed() < Duration::from_secs(30));
    }

    //=====================================================================
    // Device Tests
    //=====================================================================

    #[test]
    fn failed_device_initialization_is_not_registered() {
        let manager = InputManager::new(keys());
        let device: Arc<dyn InputDevice> = Arc::new(CountingDevice {
            fail_init: true,
            ..CountingDevice::default()
        });

        let result = manager.register_device(device);

        assert!(matches!(result, Err(InputError::DeviceInitialization(name)) if name == "counter"));
        assert!(manager.devices().is_empty());
    }

    /// Unregistering tears the device down once and stops polling it.
    #[test]
    fn unregister_device_stops_polling() {
        let manager = InputManager::new(keys());
        let (stats, device) = counting_device();
        manager.register_device(Arc::clone(&device)).unwrap();
        manager.initialize().unwrap();

        assert!(wait_until(|| stats.polls.load(Ordering::SeqCst) > 0));
        assert!(manager.unregister_device(&device));

        let polls_after_unregister = stats.polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));

        assert_eq!(stats.polls.load(Ordering::SeqCst), polls_after_unregister);
        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
        assert!(!stats.polled_after_destroy.load(Ordering::SeqCst));

        manager.shutdown();
        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_unknown_device_is_noop() {
        let manager = InputManager::new(keys());
        let (registered_stats, registered) = counting_device();
        let (stranger_stats, stranger) = counting_device();
        manager.register_device(registered).unwrap();

        assert!(!manager.unregister_device(&stranger));

        assert_eq!(manager.devices().len(), 1);
        assert_eq!(registered_stats.destroys.load(Ordering::SeqCst), 0);
        assert_eq!(stranger_stats.destroys.load(Ordering::SeqCst), 0);
    }

    //=====================================================================
    // Push & Dispatch Tests
    //=====================================================================

    /// Unregistered key handles never reach the queue.
    #[test]
    fn unknown_key_push_is_dropped() {
        let manager = InputManager::new(keys());

        manager.push_key_state_change(KeyHandle::from_name("Key_NotARealKey"), true);
        assert_eq!(manager.pending_events(), 0);

        manager.push_key_state_change(KeyHandle::from_name("Key_W"), true);
        assert_eq!(manager.pending_events(), 1);
    }

    #[test]
    fn process_events_delivers_in_push_order_and_clears() {
        let manager = InputManager::new(keys());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.add_input_listener(
            move |event: &InputEvent| {
                sink.lock().unwrap().push(*event);
                false
            },
            false,
        );

        let w = KeyHandle::from_name("Key_W");
        manager.push_key_state_change(w, true);
        manager.push_mouse_position(Vec2::new(4.0, 2.0));
        manager.push_touch_move(3, Vec2::ONE);
        manager.process_events();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                InputEvent::KeyStateChange { key: w, pressed: true },
                InputEvent::MousePosition { position: Vec2::new(4.0, 2.0) },
                InputEvent::TouchMove { finger: 3, position: Vec2::ONE },
            ]
        );
        assert_eq!(manager.pending_events(), 0);
    }

    #[test]
    fn removed_listener_sees_nothing() {
        let manager = InputManager::new(keys());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = manager.add_input_listener(
            move |_: &InputEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            },
            true,
        );

        assert!(manager.remove_input_listener(id));
        manager.push_input_char('q');
        manager.process_events();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// Events pushed by devices on the worker reach listeners.
    #[test]
    fn worker_forwards_device_events() {
        struct CharDevice {
            sent: AtomicBool,
        }

        impl InputDevice for CharDevice {
            fn initialize(&self) -> bool {
                true
            }
            fn destroy(&self) {}
            fn poll(&self, events: &mut EventBuffer) {
                if !self.sent.swap(true, Ordering::SeqCst) {
                    events.push_input_char('z');
                    events.push_key_state_change(KeyHandle::from_name("Key_Bogus"), true);
                }
            }
            fn name(&self) -> String {
                "chars".to_owned()
            }
            fn player_id(&self) -> i32 {
                1
            }
        }

        let manager = InputManager::new(keys());
        manager
            .register_device(Arc::new(CharDevice { sent: AtomicBool::new(false) }))
            .unwrap();
        manager.initialize().unwrap();

        assert!(wait_until(|| manager.pending_events() == 1));
        manager.shutdown();
    }

    //=====================================================================
    // Duplicate Registration Tests
    //=====================================================================

    /// A second registration of the same allocation is rejected without a
    /// second `initialize`, so one unregister fully stops its polling.
    #[test]
    fn duplicate_registration_is_rejected() {
        let manager = InputManager::new(keys());
        let (stats, device) = counting_device();

        manager.register_device(Arc::clone(&device)).unwrap();
        let again = manager.register_device(Arc::clone(&device));

        assert!(matches!(again, Err(InputError::DeviceAlreadyRegistered(name)) if name == "counter"));
        assert_eq!(stats.inits.load(Ordering::SeqCst), 1);
        assert_eq!(manager.devices().len(), 1);

        manager.initialize().unwrap();
        assert!(wait_until(|| stats.polls.load(Ordering::SeqCst) > 0));
        assert!(manager.unregister_device(&device));
        assert!(manager.devices().is_empty());

        thread::sleep(Duration::from_millis(20));
        manager.shutdown();

        assert!(!stats.polled_after_destroy.load(Ordering::SeqCst));
        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
    }

    //=====================================================================
    // Panic Containment Tests
    //=====================================================================

    /// A listener panicking during dispatch does not cause the same events
    /// to be delivered again by the next `process_events`.
    #[test]
    fn listener_panic_does_not_redeliver_events() {
        let manager = InputManager::new(keys());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        manager.add_input_listener(
            move |event: &InputEvent| {
                if *event == (InputEvent::InputChar { ch: 'a' }) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                false
            },
            true,
        );
        manager.add_input_listener(
            |event: &InputEvent| {
                if *event == (InputEvent::InputChar { ch: 'b' }) {
                    panic!("listener failure");
                }
                false
            },
            false,
        );

        manager.push_input_char('a');
        manager.push_input_char('b');
        let result = panic::catch_unwind(AssertUnwindSafe(|| manager.process_events()));
        assert!(result.is_err());

        assert_eq!(manager.pending_events(), 0);
        manager.process_events();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    /// A device panicking in `poll` is contained; the worker keeps going
    /// and events pushed before the panic are kept.
    #[test]
    fn device_panic_does_not_stop_worker() {
        struct FlakyDevice {
            panicked: AtomicBool,
        }

        impl InputDevice for FlakyDevice {
            fn initialize(&self) -> bool {
                true
            }
            fn destroy(&self) {}
            fn poll(&self, events: &mut EventBuffer) {
                if !self.panicked.swap(true, Ordering::SeqCst) {
                    events.push_input_char('x');
                    panic!("device failure");
                }
            }
            fn name(&self) -> String {
                "flaky".to_owned()
            }
            fn player_id(&self) -> i32 {
                0
            }
        }

        let manager = InputManager::new(keys());
        let (stats, device) = counting_device();
        manager
            .register_device(Arc::new(FlakyDevice { panicked: AtomicBool::new(false) }))
            .unwrap();
        manager.register_device(device).unwrap();
        manager.initialize().unwrap();

        assert!(wait_until(|| stats.polls.load(Ordering::SeqCst) > 10));
        assert!(manager.is_initialized());
        assert_eq!(manager.pending_events(), 1);

        manager.shutdown();
        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
    }

    //=====================================================================
    // Lock Domain Tests
    //=====================================================================

    /// Device whose first poll parks the worker, device lock held, until
    /// released.
    struct GatedDevice {
        entered: Sender<()>,
        release: Receiver<()>,
        gated: AtomicBool,
    }

    impl InputDevice for GatedDevice {
        fn initialize(&self) -> bool {
            true
        }
        fn destroy(&self) {}
        fn poll(&self, _events: &mut EventBuffer) {
            if !self.gated.swap(true, Ordering::SeqCst) {
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
        }
        fn name(&self) -> String {
            "gated".to_owned()
        }
        fn player_id(&self) -> i32 {
            0
        }
    }

    /// Runs `work` on its own thread and reports whether it finished in time.
    fn finishes_within(timeout: Duration, work: impl FnOnce() + Send + 'static) -> bool {
        let (done_tx, done_rx) = bounded(1);
        thread::spawn(move || {
            work();
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(timeout).is_ok()
    }

    /// Pushes, listener changes and dispatch complete while a poll holds
    /// the device lock.
    #[test]
    fn event_domain_is_free_while_device_lock_is_held() {
        let manager = Arc::new(InputManager::new(keys()));
        // Declared after the manager: dropping `release_tx` first unparks
        // the worker if an assertion fails early.
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);

        manager
            .register_device(Arc::new(GatedDevice {
                entered: entered_tx,
                release: release_rx,
                gated: AtomicBool::new(false),
            }))
            .unwrap();
        manager.initialize().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let shared = Arc::clone(&manager);
        let event_side_done = finishes_within(Duration::from_secs(5), move || {
            shared.push_input_char('k');
            shared.add_input_listener(|_: &InputEvent| false, false);
            shared.process_events();
        });

        // The device domain itself is held by the parked poll.
        let shared = Arc::clone(&manager);
        let (_, device) = counting_device();
        let (registered_tx, registered_rx) = bounded(1);
        thread::spawn(move || {
            let _ = shared.register_device(device);
            let _ = registered_tx.send(());
        });
        let device_side_blocked = registered_rx.recv_timeout(Duration::from_millis(50)).is_err();

        release_tx.send(()).unwrap();
        let device_side_done = registered_rx.recv_timeout(Duration::from_secs(5)).is_ok();
        manager.shutdown();

        assert!(event_side_done);
        assert!(device_side_blocked);
        assert!(device_side_done);
    }

    /// Device registration and removal complete while a listener runs
    /// under the event lock.
    #[test]
    fn device_domain_is_free_while_event_lock_is_held() {
        let manager = Arc::new(InputManager::new(keys()));
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded::<()>(1);

        manager.add_input_listener(
            move |_: &InputEvent| {
                let _ = entered_tx.send(());
                let _ = release_rx.recv();
                false
            },
            false,
        );
        manager.push_input_char('k');

        let consumer = Arc::clone(&manager);
        let tick = thread::spawn(move || consumer.process_events());
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let shared = Arc::clone(&manager);
        let (stats, device) = counting_device();
        let device_side_done = finishes_within(Duration::from_secs(5), move || {
            shared.register_device(Arc::clone(&device)).unwrap();
            assert!(shared.unregister_device(&device));
        });

        // The event domain itself is held by the running listener.
        let shared = Arc::clone(&manager);
        let (pushed_tx, pushed_rx) = bounded(1);
        thread::spawn(move || {
            shared.push_input_char('z');
            let _ = pushed_tx.send(());
        });
        let event_side_blocked = pushed_rx.recv_timeout(Duration::from_millis(50)).is_err();

        release_tx.send(()).unwrap();
        tick.join().unwrap();
        let event_side_done = pushed_rx.recv_timeout(Duration::from_secs(5)).is_ok();

        assert!(device_side_done);
        assert!(event_side_blocked);
        assert!(event_side_done);
        assert_eq!(stats.inits.load(Ordering::SeqCst), 1);
        assert_eq!(stats.destroys.load(Ordering::SeqCst), 1);
    }
}
