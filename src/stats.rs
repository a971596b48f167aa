//! descriptive statistics over a buffer snapshot

use crate::domain::{Channel, ChannelKind, ChannelStats, IngestStats, Reading, Summary};

/// build the dashboard summary for one snapshot
pub fn summarize(
    readings: &[Reading],
    capacity: usize,
    ingest: IngestStats,
    generated_at_ms: u64,
) -> Summary {
    let channels: Vec<ChannelStats> = Channel::ALL
        .into_iter()
        .filter_map(|c| channel_stats(readings, c))
        .collect();

    Summary {
        count: readings.len(),
        capacity,
        max_temperature: max_of_kind(readings, ChannelKind::Temperature),
        avg_temperature: mean_of_kind(readings, ChannelKind::Temperature),
        avg_humidity: mean_of_kind(readings, ChannelKind::Humidity),
        channels,
        latest: readings.last().copied(),
        ingest,
        generated_at_ms,
    }
}

/// mean/min/max of one channel, `None` for an empty snapshot
pub fn channel_stats(readings: &[Reading], channel: Channel) -> Option<ChannelStats> {
    if readings.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for r in readings {
        let v = r.channel(channel);
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some(ChannelStats {
        channel,
        mean: sum / readings.len() as f64,
        min,
        max,
    })
}

fn values_of_kind(readings: &[Reading], kind: ChannelKind) -> impl Iterator<Item = f64> + '_ {
    readings
        .iter()
        .flat_map(move |r| Channel::of_kind(kind).map(move |c| r.channel(c)))
}

fn max_of_kind(readings: &[Reading], kind: ChannelKind) -> Option<f64> {
    values_of_kind(readings, kind).reduce(f64::max)
}

// every row carries every channel, so the flat mean equals the mean of column means
fn mean_of_kind(readings: &[Reading], kind: ChannelKind) -> Option<f64> {
    let (sum, n) = values_of_kind(readings, kind).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
