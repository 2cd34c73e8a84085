//! Headset sessions.
//!
//! A session owns every opened interface of one dongle. Each interface gets
//! a reader thread (`hidapi` reads block) that forwards raw reports to a
//! single worker task. The worker alone owns the report processor, the
//! keep-alive scheduler and the handle table, so reports from all
//! interfaces are decoded one at a time, in arrival order, against one
//! shared dedupe state. Wake-up writes and closes wait on the same device
//! lock as the readers, so they run on the blocking pool.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use cloudflight_core::{HeadsetEvent, PowerState, ReportProcessor, SessionConfig};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::backend::{HidApiBackend, HidBackend};
use crate::device::{DeviceDescriptor, select_interfaces, select_status_interface};
use crate::error::{HidError, HidResult};
use crate::handle::DeviceHandle;
use crate::scheduler::KeepAlive;

/// Receiving side of a session's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<HeadsetEvent>;

/// How long a reader waits for a report before checking whether its
/// handle was closed.
const READ_POLL: Duration = Duration::from_millis(100);
const REPORT_QUEUE: usize = 64;

/// Messages from reader threads and wake-up writes to the worker.
enum WorkerMessage {
    Report { path: String, data: Vec<u8> },
    Failed(HidError),
}

enum Command {
    Bootstrap,
    Shutdown(oneshot::Sender<()>),
}

/// A running headset session.
///
/// Dropping the session without calling [`shutdown`](Self::shutdown) also
/// stops the worker and closes the interfaces once the worker notices. If
/// the runtime goes away first, the interfaces close when the worker is
/// dropped and the reader threads exit on their next poll.
pub struct Session {
    command_tx: mpsc::Sender<Command>,
    worker: JoinHandle<()>,
}

impl Session {
    /// Open a session against the system HID library.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// See [`Session::open`].
    pub fn connect(config: SessionConfig) -> HidResult<(Self, EventReceiver)> {
        let backend = HidApiBackend::new()?;
        Self::open(Arc::new(backend), config)
    }

    /// Discover the headset, open its interfaces and start the session.
    ///
    /// Interfaces that fail to open are reported as `error` events on the
    /// returned receiver and skipped. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns [`HidError::DeviceNotFound`] if no interface matches, or an
    /// error if the configuration is invalid or enumeration fails.
    pub fn open(
        backend: Arc<dyn HidBackend>,
        config: SessionConfig,
    ) -> HidResult<(Self, EventReceiver)> {
        config.validate()?;
        let interfaces = select_interfaces(&backend.enumerate()?)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::channel(REPORT_QUEUE);
        let (command_tx, command_rx) = mpsc::channel(8);

        let mut worker = Worker {
            backend,
            processor: ReportProcessor::new(config.dedupe_policy()),
            keepalive: KeepAlive::new(config.update_delay()),
            debug: config.debug,
            interfaces: interfaces.clone(),
            handles: HashMap::new(),
            event_tx,
            report_tx,
            report_rx,
            command_rx,
        };

        for descriptor in &interfaces {
            if let Err(e) = worker.open_interface(descriptor) {
                worker.report(e);
            }
        }
        info!(
            opened = worker.handles.len(),
            selected = interfaces.len(),
            "Headset session started"
        );

        worker.bootstrap();
        let worker = tokio::spawn(worker.run());

        Ok((Self { command_tx, worker }, event_rx))
    }

    /// Re-run the keep-alive bootstrap.
    ///
    /// Useful after a `StatusInterfaceNotFound` error: the interfaces are
    /// enumerated again and the wake-up timer is armed if the status
    /// interface is now present.
    ///
    /// # Errors
    /// Returns [`HidError::Closed`] if the session has stopped.
    pub async fn bootstrap(&self) -> HidResult<()> {
        self.command_tx.send(Command::Bootstrap).await.map_err(|_| HidError::Closed)
    }

    /// Disarm the keep-alive and close every opened interface.
    pub async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.command_tx.send(Command::Shutdown(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Session worker did not exit cleanly");
        }
    }
}

struct Worker {
    backend: Arc<dyn HidBackend>,
    processor: ReportProcessor,
    keepalive: KeepAlive,
    debug: bool,
    interfaces: Vec<DeviceDescriptor>,
    handles: HashMap<String, Arc<DeviceHandle>>,
    event_tx: mpsc::UnboundedSender<HeadsetEvent>,
    report_tx: mpsc::Sender<WorkerMessage>,
    report_rx: mpsc::Receiver<WorkerMessage>,
    command_rx: mpsc::Receiver<Command>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                Some(message) = self.report_rx.recv() => self.handle_message(message),

                () = self.keepalive.tick() => {
                    trace!("Keep-alive tick");
                    if let Err(e) = self.wake() {
                        self.report(e);
                    }
                }

                command = self.command_rx.recv() => match command {
                    Some(Command::Bootstrap) => self.bootstrap(),
                    Some(Command::Shutdown(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        debug!("Session dropped without shutdown");
                        self.shutdown().await;
                        return;
                    }
                },
            }
        }
    }

    fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Report { path, data } => self.handle_report(&path, &data),
            WorkerMessage::Failed(err) => self.report(err),
        }
    }

    fn handle_report(&mut self, path: &str, data: &[u8]) {
        if self.debug {
            info!(path, len = data.len(), report = ?data, "Raw report");
        } else {
            trace!(path, len = data.len(), report = ?data, "Raw report");
        }

        let processed = self.processor.process(data, Instant::now().into_std());
        for event in processed.events {
            self.emit(event);
        }

        match processed.power {
            Some(PowerState::On) => self.bootstrap(),
            Some(PowerState::Off) => {
                self.keepalive.disarm();
            }
            None => {}
        }
    }

    /// Arm the keep-alive and poke the status interface right away.
    fn bootstrap(&mut self) {
        if self.keepalive.status().is_none() && self.locate_status_interface().is_none() {
            self.report(HidError::StatusInterfaceNotFound);
            return;
        }

        self.keepalive.arm();
        if let Err(e) = self.wake() {
            self.report(e);
        }
    }

    /// Start a wake-up write. A failed write comes back as a message.
    fn wake(&mut self) -> HidResult<()> {
        let path = match self.keepalive.status() {
            Some(handle) => handle.path().to_string(),
            None => {
                let descriptor =
                    self.locate_status_interface().ok_or(HidError::StatusInterfaceNotFound)?;
                let handle = self.open_interface(&descriptor)?;
                self.keepalive.attach(handle);
                descriptor.path
            }
        };

        let write = self.keepalive.poke()?;
        let report_tx = self.report_tx.clone();
        tokio::spawn(async move {
            let err = match write.await {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(join) => HidError::WakeupWriteFailure { path, reason: join.to_string() },
            };
            let _ = report_tx.send(WorkerMessage::Failed(err)).await;
        });
        Ok(())
    }

    fn locate_status_interface(&mut self) -> Option<DeviceDescriptor> {
        if let Some(descriptor) = select_status_interface(&self.interfaces) {
            return Some(descriptor.clone());
        }

        // Some hosts expose the status interface only after the headset
        // has been powered on, so look again.
        match self.backend.enumerate().and_then(|devices| select_interfaces(&devices)) {
            Ok(interfaces) => self.interfaces = interfaces,
            Err(e) => debug!(error = %e, "Re-enumeration found no interfaces"),
        }
        select_status_interface(&self.interfaces).cloned()
    }

    fn open_interface(&mut self, descriptor: &DeviceDescriptor) -> HidResult<Arc<DeviceHandle>> {
        if let Some(handle) = self.handles.get(&descriptor.path) {
            return Ok(Arc::clone(handle));
        }

        let device = self.backend.open(descriptor).map_err(|e| HidError::InterfaceOpenFailure {
            path: descriptor.path.clone(),
            reason: e.to_string(),
        })?;
        let handle = Arc::new(DeviceHandle::new(descriptor.clone(), device));

        if let Err(e) = spawn_reader(&handle, self.report_tx.clone()) {
            handle.close();
            return Err(HidError::Io { path: descriptor.path.clone(), reason: e.to_string() });
        }

        info!(
            path = %descriptor.path,
            usage = format_args!("{:#06x}", descriptor.usage),
            usage_page = format_args!("{:#06x}", descriptor.usage_page),
            "Opened interface"
        );
        self.handles.insert(descriptor.path.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    async fn shutdown(&mut self) {
        self.keepalive.disarm();
        let mut handles: Vec<_> = self.handles.drain().map(|(_, handle)| handle).collect();
        handles.extend(self.keepalive.detach());

        let closing =
            tokio::task::spawn_blocking(move || handles.iter().filter(|h| h.close()).count());
        match closing.await {
            Ok(closed) => info!(closed, "Headset session shut down"),
            Err(e) => warn!(error = %e, "Closing interfaces did not finish"),
        }
    }

    fn emit(&self, event: HeadsetEvent) {
        let _ = self.event_tx.send(event);
    }

    fn report(&self, err: HidError) {
        warn!(error = %err, "Headset session error");
        self.emit(HeadsetEvent::error(err));
    }
}

/// Start a reader thread. The thread only holds a weak reference, so it
/// never keeps an interface open once the worker has let go of it.
fn spawn_reader(
    handle: &Arc<DeviceHandle>,
    report_tx: mpsc::Sender<WorkerMessage>,
) -> std::io::Result<()> {
    let path = handle.path().to_string();
    let handle = Arc::downgrade(handle);
    std::thread::Builder::new()
        .name("hid-reader".to_string())
        .spawn(move || read_loop(&path, &handle, &report_tx))?;
    Ok(())
}

fn read_loop(path: &str, handle: &Weak<DeviceHandle>, report_tx: &mpsc::Sender<WorkerMessage>) {
    while !report_tx.is_closed() {
        let Some(handle) = handle.upgrade() else {
            break;
        };
        match handle.read_report(READ_POLL) {
            Ok(Some(data)) => {
                let message = WorkerMessage::Report { path: path.to_string(), data };
                if report_tx.blocking_send(message).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(HidError::Closed) => break,
            Err(err) => {
                // The handle stays open; reopening is left to the caller.
                let _ = report_tx.blocking_send(WorkerMessage::Failed(err));
                break;
            }
        }
    }
    debug!(path, "Reader stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use cloudflight_core::VolumeDirection;
    use parking_lot::Mutex;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::backend::ReportDevice;
    use crate::device::{HYPERX_VID, STATUS_USAGE};
    use crate::scheduler::WAKEUP_REPORT;

    #[derive(Default)]
    struct FakeInterface {
        reports: Mutex<VecDeque<Vec<u8>>>,
        writes: Mutex<Vec<Vec<u8>>>,
        fail_writes: AtomicBool,
        fail_read: AtomicBool,
        // Idle reads block for the whole timeout, like a real dongle.
        idle_full_timeout: AtomicBool,
        closed: AtomicUsize,
    }

    impl FakeInterface {
        fn push(&self, report: &[u8]) {
            self.reports.lock().push_back(report.to_vec());
        }

        fn write_count(&self) -> usize {
            self.writes.lock().len()
        }

        fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    struct FakeDevice(Arc<FakeInterface>);

    impl ReportDevice for FakeDevice {
        fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
            if self.0.fail_read.swap(false, Ordering::SeqCst) {
                return Err(HidError::InvalidPath("device unplugged".into()));
            }
            if let Some(report) = self.0.reports.lock().pop_front() {
                buf[..report.len()].copy_from_slice(&report);
                return Ok(report.len());
            }
            let mut wait = u64::try_from(timeout_ms).unwrap_or(0);
            if !self.0.idle_full_timeout.load(Ordering::SeqCst) {
                wait = wait.min(5);
            }
            std::thread::sleep(Duration::from_millis(wait));
            Ok(0)
        }

        fn write(&self, data: &[u8]) -> HidResult<usize> {
            if self.0.fail_writes.load(Ordering::SeqCst) {
                return Err(HidError::InvalidPath("write rejected".into()));
            }
            self.0.writes.lock().push(data.to_vec());
            Ok(data.len())
        }
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeBackend {
        descriptors: Mutex<Vec<DeviceDescriptor>>,
        interfaces: Mutex<HashMap<String, Arc<FakeInterface>>>,
        fail_open: HashSet<String>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(descriptors: Vec<DeviceDescriptor>) -> Self {
            Self {
                descriptors: Mutex::new(descriptors),
                interfaces: Mutex::new(HashMap::new()),
                fail_open: HashSet::new(),
                opened: Mutex::new(Vec::new()),
            }
        }

        fn failing_open(mut self, path: &str) -> Self {
            self.fail_open.insert(path.to_string());
            self
        }

        fn interface(&self, path: &str) -> Arc<FakeInterface> {
            Arc::clone(self.interfaces.lock().entry(path.to_string()).or_default())
        }

        fn add(&self, descriptor: DeviceDescriptor) {
            self.descriptors.lock().push(descriptor);
        }
    }

    impl HidBackend for FakeBackend {
        fn enumerate(&self) -> HidResult<Vec<DeviceDescriptor>> {
            Ok(self.descriptors.lock().clone())
        }

        fn open(&self, descriptor: &DeviceDescriptor) -> HidResult<Box<dyn ReportDevice>> {
            if self.fail_open.contains(&descriptor.path) {
                return Err(HidError::InvalidPath("permission denied".into()));
            }
            self.opened.lock().push(descriptor.path.clone());
            Ok(Box::new(FakeDevice(self.interface(&descriptor.path))))
        }
    }

    fn control(path: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: HYPERX_VID,
            product_id: 0x16c4,
            product_name: Some("HyperX Cloud Flight Wireless Headset".into()),
            usage: 0x0001,
            usage_page: 0x000c,
            path: path.to_string(),
        }
    }

    fn status(path: &str) -> DeviceDescriptor {
        DeviceDescriptor { usage: STATUS_USAGE, usage_page: 0xff53, ..control(path) }
    }

    fn headset() -> Arc<FakeBackend> {
        Arc::new(FakeBackend::new(vec![control("ctrl"), status("status")]))
    }

    fn fast_config() -> SessionConfig {
        SessionConfig { update_delay_ms: 20, ..SessionConfig::default() }
    }

    async fn next_event(events: &mut EventReceiver) -> HeadsetEvent {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_no_matching_device_fails_construction() {
        let backend = Arc::new(FakeBackend::new(vec![DeviceDescriptor {
            vendor_id: 0x046d,
            product_id: 0xc52b,
            product_name: Some("Unifying Receiver".into()),
            usage: 1,
            usage_page: 1,
            path: "mouse".into(),
        }]));

        let result = Session::open(backend.clone(), SessionConfig::default());
        assert_matches!(result.err(), Some(HidError::DeviceNotFound));
        assert!(backend.opened.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_construction() {
        let config = SessionConfig { update_delay_ms: 0, ..SessionConfig::default() };
        let result = Session::open(headset(), config);
        assert_matches!(result.err(), Some(HidError::Config(_)));
    }

    #[tokio::test]
    async fn test_opens_each_interface_once_and_pokes_status() {
        let backend = headset();
        let (session, _events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();

        let mut opened = backend.opened.lock().clone();
        opened.sort();
        assert_eq!(opened, ["ctrl", "status"]);

        let status = backend.interface("status");
        wait_until(|| status.write_count() == 1).await;
        assert_eq!(*status.writes.lock(), vec![WAKEUP_REPORT.to_vec()]);
        assert_eq!(backend.interface("ctrl").write_count(), 0);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_power_sequence_drives_keepalive() {
        let backend = headset();
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();
        let ctrl = backend.interface("ctrl");
        let status = backend.interface("status");
        wait_until(|| status.write_count() == 1).await;

        ctrl.push(&[0x64, 0x01]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Power(PowerState::On));
        wait_until(|| status.write_count() == 2).await;

        ctrl.push(&[0x64, 0x03]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Power(PowerState::Off));
        sleep(Duration::from_millis(50)).await;
        assert_eq!(status.write_count(), 2);

        ctrl.push(&[0x64, 0x01]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Power(PowerState::On));
        wait_until(|| status.write_count() == 3).await;

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_keepalive_repeats_until_power_off() {
        let backend = headset();
        let (session, mut events) = Session::open(backend.clone(), fast_config()).unwrap();
        let status = backend.interface("status");

        wait_until(|| status.write_count() >= 3).await;

        backend.interface("ctrl").push(&[0x64, 0x03]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Power(PowerState::Off));
        // Let a write started by the last tick land
        sleep(Duration::from_millis(50)).await;
        let after_off = status.write_count();

        sleep(Duration::from_millis(150)).await;
        assert_eq!(status.write_count(), after_off);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_shared_state_across_interfaces() {
        let backend = headset();
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();
        let ctrl = backend.interface("ctrl");
        let status = backend.interface("status");

        ctrl.push(&[0x64, 0x03]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Power(PowerState::Off));

        status.push(&[0x65, 0x04]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Muted(true));

        // A repeated power-off on the other interface is a duplicate
        status.push(&[0x64, 0x03]);
        ctrl.push(&[0x65, 0x00]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Muted(false));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_decodes_every_report_shape() {
        let backend = headset();
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();
        let ctrl = backend.interface("ctrl");
        let status = backend.interface("status");

        ctrl.push(&[0x65, 0x02, 0x00, 0x00, 0x00]);
        assert_eq!(
            next_event(&mut events).await,
            HeadsetEvent::Volume(VolumeDirection::Down)
        );

        let mut report = [0u8; 15];
        report[3] = 0x10;
        report[4] = 5;
        status.push(&report);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Charging(false));
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Battery(100));

        let mut report = [0u8; 20];
        report[3] = 0x0f;
        report[4] = 60;
        status.push(&report);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Battery(80));

        ctrl.push(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            next_event(&mut events).await,
            HeadsetEvent::Unknown(vec![1, 2, 3, 4, 5, 6, 7])
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_failure_is_reported_and_skipped() {
        let backend = Arc::new(
            FakeBackend::new(vec![control("ctrl"), status("status")]).failing_open("ctrl"),
        );
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();

        assert_matches!(
            next_event(&mut events).await,
            HeadsetEvent::Error(message) if message.contains("ctrl")
        );

        backend.interface("status").push(&[0x65, 0x04]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Muted(true));

        session.shutdown().await;
        assert_eq!(backend.interface("status").closed(), 1);
    }

    #[tokio::test]
    async fn test_missing_status_interface_is_recoverable() {
        let backend = Arc::new(FakeBackend::new(vec![control("ctrl")]));
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();

        assert_matches!(
            next_event(&mut events).await,
            HeadsetEvent::Error(message) if message.contains("Status interface not found")
        );

        // Reports keep flowing without the keep-alive
        backend.interface("ctrl").push(&[0x65, 0x04]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Muted(true));

        backend.add(status("status"));
        session.bootstrap().await.unwrap();

        let status = backend.interface("status");
        wait_until(|| status.write_count() == 1).await;
        assert_eq!(*status.writes.lock(), vec![WAKEUP_REPORT.to_vec()]);

        session.shutdown().await;
        assert_eq!(status.closed(), 1);
    }

    #[tokio::test]
    async fn test_wakeup_failure_keeps_timer_armed() {
        let backend = headset();
        backend.interface("status").fail_writes.store(true, Ordering::SeqCst);
        let (session, mut events) = Session::open(backend.clone(), fast_config()).unwrap();

        for _ in 0..3 {
            assert_matches!(
                next_event(&mut events).await,
                HeadsetEvent::Error(message) if message.contains("wake-up")
            );
        }

        backend.interface("status").fail_writes.store(false, Ordering::SeqCst);
        let status = backend.interface("status");
        wait_until(|| status.write_count() >= 1).await;

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_failure_is_reported_without_closing() {
        let backend = headset();
        backend.interface("ctrl").fail_read.store(true, Ordering::SeqCst);
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();

        assert_matches!(
            next_event(&mut events).await,
            HeadsetEvent::Error(message) if message.contains("IO error on ctrl")
        );
        assert_eq!(backend.interface("ctrl").closed(), 0);

        session.shutdown().await;
        assert_eq!(backend.interface("ctrl").closed(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_every_handle_once() {
        let backend = headset();
        let (session, mut events) = Session::open(backend.clone(), fast_config()).unwrap();
        let ctrl = backend.interface("ctrl");
        let status = backend.interface("status");

        session.shutdown().await;
        assert_eq!(ctrl.closed(), 1);
        assert_eq!(status.closed(), 1);

        let writes = status.write_count();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(status.write_count(), writes);

        // The worker dropped its sender
        while let Ok(Some(_)) = timeout(Duration::from_secs(5), events.recv()).await {}
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_session_stops_worker() {
        let backend = headset();
        let (session, mut events) =
            Session::open(backend.clone(), SessionConfig::default()).unwrap();
        drop(session);

        assert!(timeout(Duration::from_secs(5), events.recv()).await.unwrap().is_none());
        assert_eq!(backend.interface("ctrl").closed(), 1);
        assert_eq!(backend.interface("status").closed(), 1);
    }

    #[tokio::test]
    async fn test_wakeup_write_does_not_stall_runtime() {
        let backend = headset();
        let status = backend.interface("status");
        status.idle_full_timeout.store(true, Ordering::SeqCst);
        let (session, _events) = Session::open(backend.clone(), fast_config()).unwrap();

        // Every tick queues a write behind a reader parked in a full poll
        let mut longest = Duration::ZERO;
        let started = std::time::Instant::now();
        while started.elapsed() < Duration::from_millis(300) {
            let before = std::time::Instant::now();
            sleep(Duration::from_millis(1)).await;
            longest = longest.max(before.elapsed());
        }
        assert!(longest < Duration::from_millis(60), "runtime stalled for {longest:?}");

        wait_until(|| status.write_count() >= 1).await;
        session.shutdown().await;
        assert_eq!(status.closed(), 1);
    }

    #[test]
    fn test_dropped_runtime_releases_interfaces() {
        let backend = headset();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (session, _events) = runtime
            .block_on(async { Session::open(backend.clone(), SessionConfig::default()) })
            .unwrap();
        drop(runtime);

        let ctrl = backend.interface("ctrl");
        let status = backend.interface("status");
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while (ctrl.closed() == 0 || status.closed() == 0) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ctrl.closed(), 1);
        assert_eq!(status.closed(), 1);
        drop(session);
    }

    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn logged_at_info(debug: bool) -> String {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let backend = headset();
        let config = SessionConfig { debug, ..SessionConfig::default() };
        let (session, mut events) = Session::open(backend.clone(), config).unwrap();
        backend.interface("ctrl").push(&[0x65, 0x04]);
        assert_eq!(next_event(&mut events).await, HeadsetEvent::Muted(true));
        session.shutdown().await;

        String::from_utf8_lossy(&capture.0.lock()).into_owned()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_debug_logs_raw_reports_at_info() {
        let logs = logged_at_info(true).await;
        assert!(logs.contains("Raw report"), "{logs}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_raw_reports_hidden_at_info_without_debug() {
        let logs = logged_at_info(false).await;
        assert!(!logs.contains("Raw report"), "{logs}");
        assert!(logs.contains("Headset session started"), "{logs}");
    }
}
