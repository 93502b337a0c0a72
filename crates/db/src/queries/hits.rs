use geowatch_core::token::{hit_id, ChannelToken};

use crate::models::{Channel, Coords, Hit, HitKind, LocationInput};
use crate::store::Store;

pub async fn record_location(store: &Store, token: &ChannelToken, input: LocationInput) -> Hit {
    store
        .update(token, |channel, ts| {
            let hit = Hit {
                id: fresh_id(channel),
                ts: ts.to_string(),
                kind: HitKind::Location,
                ip: input.ip,
                ua: input.ua,
                coords: input.coords,
                ip_label: input.ip_label,
                place: input.place,
                photo_url: None,
                parent_id: None,
            };
            channel.push_hit(hit.clone());
            hit
        })
        .await
}

/// Record a photo taken for `parent_id`. The parent's location is copied as
/// it stands now; an unknown parent yields an unlinked photo hit carrying the
/// uploader's ip/ua and no coordinates.
pub async fn attach_photo(
    store: &Store,
    token: &ChannelToken,
    parent_id: &str,
    ip: String,
    ua: String,
    photo_url: String,
) -> Hit {
    store
        .update(token, |channel, ts| {
            let id = fresh_id(channel);
            let hit = match channel.find_hit(parent_id) {
                Some(parent) => Hit::photo_of(parent, id, ts.to_string(), photo_url),
                None => Hit {
                    id,
                    ts: ts.to_string(),
                    kind: HitKind::Photo,
                    ip,
                    ua,
                    coords: Coords::none(),
                    ip_label: None,
                    place: None,
                    photo_url: Some(photo_url),
                    parent_id: None,
                },
            };
            channel.push_hit(hit.clone());
            hit
        })
        .await
}

/// A hit id not yet present in the channel's index.
fn fresh_id(channel: &Channel) -> String {
    fresh_id_from(channel, hit_id)
}

fn fresh_id_from(channel: &Channel, mut generate: impl FnMut() -> String) -> String {
    loop {
        let id = generate();
        if channel.find_hit(&id).is_none() {
            return id;
        }
    }
}

/// Hits newer than `since` (strictly), oldest first.
pub async fn list_since(store: &Store, token: &ChannelToken, since: Option<&str>) -> Vec<Hit> {
    store.read(token, |channel| channel.hits_since(since)).await
}

pub async fn clear(store: &Store, token: &ChannelToken) -> usize {
    store.update(token, |channel, _| channel.clear_hits()).await
}
