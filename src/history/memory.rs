use std::collections::BTreeMap;

use crate::core::{UnixTime, VariableRef};
use crate::error::{HistoryError, HistoryResult};

use super::backend::{HistoryBackend, SeriesReadout};

/// In-process history store keyed by `(event, tag)`.
///
/// Each record holds every array element of the tag at one instant, so a
/// `VariableRef::index` past the record width reads as a missing sample.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    events: BTreeMap<(String, String), Vec<(UnixTime, Vec<f64>)>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an array-valued sample; records are kept sorted by time.
    pub fn write(
        &mut self,
        event: &str,
        tag: &str,
        time: UnixTime,
        values: impl Into<Vec<f64>>,
    ) -> HistoryResult<()> {
        if time <= 0 {
            return Err(HistoryError::InvalidData(
                "history timestamps must be > 0".to_owned(),
            ));
        }
        let records = self
            .events
            .entry((event.to_owned(), tag.to_owned()))
            .or_default();
        let position = records.partition_point(|(recorded, _)| *recorded <= time);
        records.insert(position, (time, values.into()));
        Ok(())
    }

    /// Records a scalar sample.
    pub fn write_scalar(
        &mut self,
        event: &str,
        tag: &str,
        time: UnixTime,
        value: f64,
    ) -> HistoryResult<()> {
        self.write(event, tag, time, vec![value])
    }

    /// Known event names.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.events.keys().map(|(event, _)| event.clone()).collect();
        events.dedup();
        events
    }

    /// Known tags of one event.
    #[must_use]
    pub fn tags(&self, event: &str) -> Vec<String> {
        self.events
            .keys()
            .filter(|(known, _)| known == event)
            .map(|(_, tag)| tag.clone())
            .collect()
    }

    fn records(&self, var: &VariableRef) -> Option<&[(UnixTime, Vec<f64>)]> {
        self.events
            .get(&(var.event.clone(), var.tag.clone()))
            .map(Vec::as_slice)
    }
}

impl HistoryBackend for MemoryHistory {
    fn read_series(
        &self,
        start: UnixTime,
        end: UnixTime,
        downsample: i64,
        vars: &[VariableRef],
    ) -> HistoryResult<Vec<SeriesReadout>> {
        if end < start {
            return Err(HistoryError::BackendRead(format!(
                "read window end ({end}) before start ({start})"
            )));
        }

        Ok(vars
            .iter()
            .map(|var| {
                let Some(records) = self.records(var) else {
                    return SeriesReadout::not_found();
                };
                let mut timestamps = Vec::new();
                let mut values = Vec::new();
                let mut last_kept: Option<UnixTime> = None;
                for (time, record) in records {
                    if *time < start || *time > end {
                        continue;
                    }
                    let Some(value) = record.get(var.index) else {
                        continue;
                    };
                    if downsample > 0 && last_kept.is_some_and(|kept| *time - kept < downsample)
                    {
                        continue;
                    }
                    last_kept = Some(*time);
                    timestamps.push(*time);
                    values.push(*value);
                }
                SeriesReadout::new(timestamps, values)
            })
            .collect())
    }

    fn last_written(&self, at: UnixTime, vars: &[VariableRef]) -> HistoryResult<Vec<UnixTime>> {
        Ok(vars
            .iter()
            .map(|var| {
                self.records(var)
                    .and_then(|records| {
                        records
                            .iter()
                            .rev()
                            .find(|(time, record)| *time <= at && record.len() > var.index)
                    })
                    .map_or(0, |(time, _)| *time)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryHistory;
    use crate::core::VariableRef;
    use crate::history::{HistoryBackend, ReadStatus};

    #[test]
    fn out_of_order_writes_are_sorted() {
        let mut history = MemoryHistory::new();
        history.write_scalar("Slow", "T", 30, 3.0).expect("write");
        history.write_scalar("Slow", "T", 10, 1.0).expect("write");
        history.write_scalar("Slow", "T", 20, 2.0).expect("write");

        let read = history
            .read_series(0, 100, 0, &[VariableRef::new("Slow", "T")])
            .expect("read");
        assert_eq!(read[0].timestamps, vec![10, 20, 30]);
        assert_eq!(read[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn downsample_keeps_one_sample_per_interval() {
        let mut history = MemoryHistory::new();
        for time in 1..=10 {
            history
                .write_scalar("Slow", "T", time, time as f64)
                .expect("write");
        }
        let read = history
            .read_series(1, 10, 3, &[VariableRef::new("Slow", "T")])
            .expect("read");
        assert_eq!(read[0].timestamps, vec![1, 4, 7, 10]);
    }

    #[test]
    fn array_index_selects_element() {
        let mut history = MemoryHistory::new();
        history
            .write("Slow", "V", 5, vec![1.0, 2.0, 3.0])
            .expect("write");
        let vars = [
            VariableRef::new("Slow", "V").with_index(2),
            VariableRef::new("Slow", "missing"),
        ];
        let read = history.read_series(0, 10, 0, &vars).expect("read");
        assert_eq!(read[0].values, vec![3.0]);
        assert_eq!(read[1].status, ReadStatus::NotFound);
        assert_eq!(history.last_written(10, &vars).expect("lw"), vec![5, 0]);
    }
}
