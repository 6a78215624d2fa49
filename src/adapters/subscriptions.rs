use crate::domain::model::{Frequency, Subscription};
use crate::domain::ports::SubscriptionSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 記憶體中的訂閱清單，可由 CSV 匯入（欄位：id,email,city,frequency,confirmed）
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionSource {
    subscriptions: Vec<Subscription>,
}

impl InMemorySubscriptionSource {
    pub fn new(mut subscriptions: Vec<Subscription>) -> Self {
        subscriptions.sort_by_key(|s| s.id);
        Self { subscriptions }
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let source = Self::from_csv_reader(file)?;
        tracing::info!(
            "📂 Loaded {} subscriptions from {}",
            source.len(),
            path.as_ref().display()
        );
        Ok(source)
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut subscriptions = Vec::new();
        for row in csv_reader.deserialize() {
            let subscription: Subscription = row?;
            subscriptions.push(subscription);
        }
        Ok(Self::new(subscriptions))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[async_trait]
impl SubscriptionSource for InMemorySubscriptionSource {
    async fn list_confirmed(
        &self,
        frequency: Frequency,
        cursor: u64,
        page_size: usize,
    ) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.id > cursor && s.is_eligible(frequency))
            .take(page_size)
            .cloned()
            .collect())
    }
}
