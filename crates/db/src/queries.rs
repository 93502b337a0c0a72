pub mod channels;
pub mod hits;
pub mod sessions;
pub mod signals;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use geowatch_core::retention::RetentionPolicy;
    use geowatch_core::token::ChannelToken;

    use crate::backend::MemoryBackend;
    use crate::store::Store;

    pub async fn store_with(policy: RetentionPolicy) -> Store {
        Store::open(Arc::new(MemoryBackend::new()), policy).await
    }

    pub async fn store() -> Store {
        store_with(RetentionPolicy::default()).await
    }

    pub fn token(raw: &str) -> ChannelToken {
        ChannelToken::parse(raw).unwrap()
    }
}
