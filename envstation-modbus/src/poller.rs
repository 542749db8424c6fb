//! Poll cycle orchestration: read every sensor, convert, upload.

use std::future::Future;
use std::time::Duration;

use chrono::FixedOffset;
use envstation_common::{ReadingSet, current_local_time};
use envstation_uplink::{UploadStats, Uploader};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::registers::{SensorConfig, quantities};
use crate::transport::Transport;

/// Decides when the next cycle is due.
///
/// A cycle is due once `interval` has elapsed since the start of the previous
/// one. The first cycle is due one interval after creation.
#[derive(Debug, Clone, Copy)]
pub struct PollTimer {
    interval: Duration,
    last: Instant,
}

impl PollTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    /// Returns true and restarts the interval if a cycle is due at `now`.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Time left until the next cycle is due.
    pub fn until_due(&self, now: Instant) -> Duration {
        (self.last + self.interval).saturating_duration_since(now)
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sensors_ok: usize,
    pub sensors_failed: usize,
    pub uploaded: bool,
}

/// Polls a fixed register map over one transport and hands each cycle's
/// readings to an uploader.
pub struct Poller<T: Transport> {
    transport: T,
    uploader: Box<dyn Uploader>,
    sensors: Vec<SensorConfig>,
    readings: ReadingSet,
    settle_delay: Duration,
    clock: FixedOffset,
    stats: UploadStats,
}

impl<T: Transport> Poller<T> {
    /// Create a poller; every reported quantity starts at zero.
    pub fn new(
        transport: T,
        uploader: Box<dyn Uploader>,
        sensors: Vec<SensorConfig>,
        settle_delay: Duration,
        clock: FixedOffset,
    ) -> Self {
        let readings = ReadingSet::zeroed(quantities(&sensors));

        Self {
            transport,
            uploader,
            sensors,
            readings,
            settle_delay,
            clock,
            stats: UploadStats::default(),
        }
    }

    /// The latest value of every quantity.
    pub fn readings(&self) -> &ReadingSet {
        &self.readings
    }

    pub fn stats(&self) -> &UploadStats {
        &self.stats
    }

    /// Run one cycle: read each sensor in order, then upload once.
    ///
    /// A failed read leaves that sensor's quantities at their previous values.
    pub async fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for sensor in &self.sensors {
            match self
                .transport
                .read_holding_registers(
                    sensor.slave_id,
                    sensor.start_address,
                    sensor.register_count,
                )
                .await
            {
                Ok(block) => {
                    debug!(sensor = %sensor.name, slave = sensor.slave_id, registers = ?block, "Read block");

                    for channel in &sensor.channels {
                        match channel.decode(&block) {
                            Some(value) => {
                                self.readings.set(channel.quantity, value);
                                info!(
                                    "{}: {} {}",
                                    channel.quantity,
                                    value,
                                    channel.quantity.unit()
                                );
                            }
                            None => warn!(
                                sensor = %sensor.name,
                                "Block of {} registers has no register {} for {}",
                                block.len(),
                                channel.register,
                                channel.quantity
                            ),
                        }
                    }
                    report.sensors_ok += 1;
                }
                Err(e) => {
                    let category = classify(self.transport.fault_flags());
                    warn!(
                        sensor = %sensor.name,
                        slave = sensor.slave_id,
                        exception = ?category.exception_code(),
                        error = %e,
                        "Failed to read sensor: {}",
                        category
                    );
                    report.sensors_failed += 1;
                }
            }

            tokio::time::sleep(self.settle_delay).await;
        }

        self.readings.stamp(current_local_time(self.clock));

        let outcome = self.uploader.publish(self.readings.clone()).await;
        match &outcome {
            Ok(()) => info!(
                sink = self.uploader.name(),
                date = %self.readings.date_string(),
                "Uploaded readings"
            ),
            Err(e) => error!(sink = self.uploader.name(), "Upload failed: {}", e),
        }
        self.stats.record(&outcome);
        report.uploaded = outcome.is_ok();

        report
    }

    /// Poll every `interval` until `shutdown` resolves.
    ///
    /// A cycle already in progress is finished before returning.
    pub async fn run<F>(mut self, interval: Duration, shutdown: F) -> UploadStats
    where
        F: Future<Output = ()>,
    {
        info!(
            sensors = self.sensors.len(),
            sink = self.uploader.name(),
            "Starting poller (interval: {:?})",
            interval
        );

        let mut timer = PollTimer::new(interval, Instant::now());
        tokio::pin!(shutdown);

        loop {
            let wait = timer.until_due(Instant::now());
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {}
            }

            if timer.poll_due(Instant::now()) {
                let report = self.poll_once().await;
                debug!(
                    ok = report.sensors_ok,
                    failed = report.sensors_failed,
                    uploaded = report.uploaded,
                    "Cycle complete"
                );
            }
        }

        info!(
            uploads = self.stats.success,
            failed = self.stats.failed,
            "Poller stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FaultFlags;
    use crate::convert::Conversion;
    use crate::registers::{ChannelConfig, Profile};
    use crate::transport::{RegisterBlock, TransportError};
    use async_trait::async_trait;
    use envstation_common::Quantity;
    use envstation_uplink::UploadError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned responses; behaves like the RTU transport on failure.
    struct ScriptedTransport {
        script: VecDeque<Result<RegisterBlock, TransportError>>,
        calls: Vec<(u8, u16, u16, Instant)>,
        flags: FaultFlags,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RegisterBlock, TransportError>>) -> Self {
            Self {
                script: script.into(),
                calls: Vec::new(),
                flags: FaultFlags::default(),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn read_holding_registers(
            &mut self,
            slave: u8,
            start: u16,
            count: u16,
        ) -> Result<RegisterBlock, TransportError> {
            self.calls.push((slave, start, count, Instant::now()));
            let result = self.script.pop_front().unwrap_or(Err(TransportError::Timeout));
            if let Err(e) = &result {
                self.flags.record(e);
            }
            result
        }

        fn fault_flags(&mut self) -> &mut FaultFlags {
            &mut self.flags
        }
    }

    #[derive(Clone, Default)]
    struct RecordingUploader {
        sent: Arc<Mutex<Vec<ReadingSet>>>,
        fail: bool,
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn publish(&mut self, readings: ReadingSet) -> envstation_uplink::Result<()> {
            self.sent.lock().unwrap().push(readings);
            if self.fail {
                Err(UploadError::Rejected {
                    status: 500,
                    body: "down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn wind_sensor() -> SensorConfig {
        SensorConfig {
            name: "wind_speed".to_string(),
            slave_id: 1,
            start_address: 0,
            register_count: 1,
            channels: vec![ChannelConfig::new(
                Quantity::WindSpeed,
                0,
                Conversion::linear(10.0),
            )],
        }
    }

    fn poller(
        script: Vec<Result<RegisterBlock, TransportError>>,
        sensors: Vec<SensorConfig>,
        uploader: RecordingUploader,
    ) -> Poller<ScriptedTransport> {
        Poller::new(
            ScriptedTransport::new(script),
            Box::new(uploader),
            sensors,
            Duration::from_millis(300),
            wib(),
        )
    }

    #[test]
    fn test_poll_timer() {
        let start = Instant::now();
        let mut timer = PollTimer::new(Duration::from_secs(1), start);

        assert!(!timer.poll_due(start));
        assert_eq!(timer.until_due(start), Duration::from_secs(1));
        assert!(!timer.poll_due(start + Duration::from_millis(999)));
        assert!(timer.poll_due(start + Duration::from_millis(1000)));
        assert!(!timer.poll_due(start + Duration::from_millis(1500)));
        assert_eq!(
            timer.until_due(start + Duration::from_millis(1500)),
            Duration::from_millis(500)
        );
        assert!(timer.poll_due(start + Duration::from_millis(2000)));
        assert_eq!(
            timer.until_due(start + Duration::from_secs(5)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensors_read_in_order_with_settle_delay() {
        let uploader = RecordingUploader::default();
        let sensors = Profile::Weather.sensors();
        let script = vec![
            Ok(vec![123]),
            Ok(vec![270]),
            Ok(vec![850]),
            Ok(vec![301, 655, 10132]),
            Ok(vec![0, 57]),
            Ok(vec![12, 40, 0, 0, 0, 0, 410, 209, 3, 5, 7, 0, 0, 0, 0, 0]),
        ];
        let mut poller = poller(script, sensors, uploader.clone());

        let report = poller.poll_once().await;
        assert_eq!(
            report,
            CycleReport {
                sensors_ok: 6,
                sensors_failed: 0,
                uploaded: true,
            }
        );

        let calls = &poller.transport.calls;
        let slaves: Vec<u8> = calls.iter().map(|c| c.0).collect();
        assert_eq!(slaves, vec![1, 2, 6, 3, 4, 5]);
        assert_eq!((calls[3].1, calls[3].2), (0, 3));
        assert_eq!((calls[5].1, calls[5].2), (0, 16));
        for pair in calls.windows(2) {
            let gap = pair[1].3 - pair[0].3;
            assert!(gap >= Duration::from_millis(300), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(400), "gap {:?}", gap);
        }

        let sent = uploader.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let set = &sent[0];
        assert_eq!(set.get(Quantity::WindSpeed), Some(12.3));
        assert_eq!(set.get(Quantity::WindDirection), Some(270.0));
        assert_eq!(set.get(Quantity::Temperature), Some(30.1));
        assert_eq!(set.get(Quantity::Pressure), Some(1013.2));
        assert_eq!(set.get(Quantity::Rainfall), Some(5.7));
        assert_eq!(set.get(Quantity::Co2), Some(410.0));
        assert_eq!(set.get(Quantity::O2), Some(20.9));
        assert_eq!(set.get(Quantity::O3), Some(0.7));
        assert_eq!(set.date_string().len(), 19);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_previous_value() {
        let uploader = RecordingUploader::default();
        let script = vec![Ok(vec![123]), Err(TransportError::Timeout)];
        let mut poller = poller(script, vec![wind_sensor()], uploader.clone());

        poller.poll_once().await;
        let report = poller.poll_once().await;
        assert_eq!(report.sensors_failed, 1);
        assert!(report.uploaded);

        let sent = uploader.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].get(Quantity::WindSpeed), Some(12.3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_read_quantity_reports_zero() {
        let uploader = RecordingUploader::default();
        let mut poller = poller(
            vec![Err(TransportError::Exception { code: 2 })],
            vec![wind_sensor()],
            uploader.clone(),
        );

        poller.poll_once().await;

        let json = serde_json::to_value(&uploader.sent.lock().unwrap()[0]).unwrap();
        assert_eq!(json["windSpeed"], 0.0);
        assert!(json["date"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_classified_and_cleared() {
        let mut poller = poller(
            vec![Err(TransportError::Exception { code: 2 })],
            vec![wind_sensor()],
            RecordingUploader::default(),
        );

        poller.poll_once().await;
        assert_eq!(poller.transport.flags, FaultFlags::default());

        // A non-timeout, non-exception failure leaves nothing to clear.
        poller.transport.script.push_back(Err(TransportError::Io("crc".to_string())));
        let report = poller.poll_once().await;
        assert_eq!(report.sensors_failed, 1);
        assert_eq!(poller.transport.flags, FaultFlags::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_air_quality_payload_uses_breakpoints() {
        let uploader = RecordingUploader::default();
        let script = vec![Ok(vec![75, 10, 150, 250, 400, 60, 0, 0, 0])];
        let mut poller = poller(script, Profile::AirQuality.sensors(), uploader.clone());

        poller.poll_once().await;

        let json = serde_json::to_value(&uploader.sent.lock().unwrap()[0]).unwrap();
        assert_eq!(json["SO2"], 180.0);
        assert_eq!(json["O3"], 120.0);
        assert_eq!(json["HC"], 215.0);
        assert_eq!(json["CO"], 30000.0);
        assert_eq!(json["NO2"], 3000.0);
        assert_eq!(json["PM2.5"], 55.4);
        assert_eq!(json["PM10"], 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_counted() {
        let uploader = RecordingUploader {
            fail: true,
            ..Default::default()
        };
        let mut poller = poller(vec![Ok(vec![10])], vec![wind_sensor()], uploader);

        let report = poller.poll_once().await;
        assert!(!report.uploaded);
        assert_eq!(poller.stats().failed, 1);
        assert_eq!(poller.stats().success, 0);
        assert_eq!(poller.readings().get(Quantity::WindSpeed), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_every_interval_until_shutdown() {
        let uploader = RecordingUploader::default();
        let script = (0..10).map(|i| Ok(vec![i * 10])).collect();
        let poller = poller(script, vec![wind_sensor()], uploader.clone());

        let shutdown = tokio::time::sleep(Duration::from_millis(3500));
        let stats = poller.run(Duration::from_secs(1), shutdown).await;

        assert_eq!(stats.success, 3);
        let sent = uploader.sent.lock().unwrap();
        let speeds: Vec<f64> = sent
            .iter()
            .filter_map(|s| s.get(Quantity::WindSpeed))
            .collect();
        assert_eq!(speeds, vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_cycle_finishes_cycle() {
        let uploader = RecordingUploader::default();
        let mut rain = wind_sensor();
        rain.name = "rainfall".to_string();
        rain.slave_id = 4;
        let poller = poller(
            vec![Ok(vec![50]), Ok(vec![7])],
            vec![wind_sensor(), rain],
            uploader.clone(),
        );

        // The cycle starts at 1 s and spends 600 ms in settle waits.
        let shutdown = tokio::time::sleep(Duration::from_millis(1100));
        let started = Instant::now();
        let stats = poller.run(Duration::from_secs(1), shutdown).await;

        assert_eq!(stats.success, 1);
        assert_eq!(uploader.sent.lock().unwrap().len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(1600));
    }
}
