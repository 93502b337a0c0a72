use chrono::Utc;
use geowatch_core::time::iso;
use geowatch_core::token::ChannelToken;

use crate::models::{ChannelExport, ChannelInfo, ChannelSummary};
use crate::store::Store;

pub async fn get_or_create(store: &Store, token: &ChannelToken) -> ChannelInfo {
    store.get_or_create(token).await
}

/// All channels ordered by token.
pub async fn list(store: &Store) -> Vec<ChannelSummary> {
    store.summaries().await
}

pub async fn export(store: &Store, token: &ChannelToken) -> ChannelExport {
    store
        .read(token, |channel| ChannelExport {
            token: token.to_string(),
            created_at: channel.created_at.clone(),
            exported_at: iso(Utc::now()),
            hits: channel.hits().to_vec(),
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::hits;
    use crate::queries::testing::{store, token};
    use crate::models::{Coords, LocationInput};

    #[tokio::test]
    async fn test_list_is_ordered_by_token() {
        let store = store().await;
        get_or_create(&store, &token("zeta")).await;
        get_or_create(&store, &token("alpha")).await;

        let tokens: Vec<String> = list(&store).await.into_iter().map(|s| s.token).collect();
        assert_eq!(tokens, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_export_contains_hits() {
        let store = store().await;
        let t = token("exp");
        hits::record_location(
            &store,
            &t,
            LocationInput {
                ip: "8.8.8.8".to_string(),
                ua: "ua".to_string(),
                coords: Coords::gps(1.0, 2.0, None),
                ip_label: None,
                place: None,
            },
        )
        .await;

        let export = export(&store, &t).await;
        assert_eq!(export.token, "exp");
        assert_eq!(export.hits.len(), 1);
        assert!(export.exported_at >= export.created_at);
    }
}
