//! Simulated temperature readings for registered sensors.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domohub_app::ports::{InputReport, InputSink};
use domohub_domain::device::{DataValue, DeviceData};

/// Temperature of sensor `index` at `tick`, rounded to a tenth of a degree.
///
/// Each sensor follows a slow sine around `base` with its own phase.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn temperature(base: f64, tick: u64, index: usize) -> f64 {
    let phase = tick as f64 / 12.0 + index as f64;
    ((base + 2.0 * phase.sin()) * 10.0).round() / 10.0
}

/// Report a reading for every sensor address once per `period`, until the
/// hub stops consuming input.
pub(crate) async fn run(
    sensors: Arc<Mutex<Vec<String>>>,
    sink: InputSink,
    period: Duration,
    base: f64,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    let mut tick = 0_u64;
    while !sink.is_closed() {
        ticker.tick().await;
        tick += 1;
        let addresses = sensors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (index, address) in addresses.into_iter().enumerate() {
            let mut data = DeviceData::new();
            data.insert(
                "temperature".to_string(),
                DataValue::Float(temperature(base, tick, index)),
            );
            data.insert(
                "device_type_string".to_string(),
                DataValue::from("virtual"),
            );
            sink.report(InputReport::data(address, data)).await;
        }
    }
    tracing::debug!("input channel closed, simulation stopped");
}
