use crate::domain::model::CityOutcome;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// 單次廣播內的城市天氣暫存；每個城市只寫入一次
#[derive(Debug, Default)]
pub struct CityWeatherMemo {
    entries: HashMap<String, CityOutcome>,
}

impl CityWeatherMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, city: &str) -> Option<&CityOutcome> {
        self.entries.get(city)
    }

    /// 寫入結果並回傳目前保存的值；已存在時保留原值
    pub fn record(&mut self, city: &str, outcome: CityOutcome) -> &CityOutcome {
        match self.entries.entry(city.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!("Memo entry for {} already fixed, keeping it", city);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(outcome),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unavailable_count(&self) -> usize {
        self.entries
            .values()
            .filter(|outcome| !outcome.is_available())
            .count()
    }
}
