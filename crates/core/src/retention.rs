use chrono::{DateTime, TimeDelta, Utc};

use crate::time::iso;
use crate::types::Channel;

/// Bounds applied to a channel after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_hits: usize,
    pub max_sessions: usize,
    pub max_signals: usize,
    /// Maximum hit age in seconds; 0 disables the age check.
    pub hit_ttl_secs: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_hits: 1000,
            max_sessions: 200,
            max_signals: 50,
            hit_ttl_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub expired_hits: usize,
    pub hits: usize,
    pub sessions: usize,
    pub signals: usize,
}

impl TrimReport {
    pub fn is_empty(&self) -> bool {
        *self == TrimReport::default()
    }
}

impl RetentionPolicy {
    /// Trim `channel` in place. Surviving entries keep their relative order,
    /// and applying the policy twice with the same `now` changes nothing the
    /// second time.
    pub fn apply(&self, channel: &mut Channel, now: DateTime<Utc>) -> TrimReport {
        let mut report = TrimReport::default();

        if let Some(cutoff) = self.ttl_cutoff(now) {
            report.expired_hits = channel.retain_hits(|hit| hit.ts >= cutoff);
        }

        let overflow = channel.hits().len().saturating_sub(self.max_hits);
        report.hits = channel.drop_oldest_hits(overflow);

        report.sessions = self.evict_sessions(channel);

        for queue in channel.signals.values_mut() {
            let overflow = queue.len().saturating_sub(self.max_signals);
            if overflow > 0 {
                queue.drain(..overflow);
                report.signals += overflow;
            }
        }
        channel.signals.retain(|_, queue| !queue.is_empty());

        report
    }

    fn ttl_cutoff(&self, now: DateTime<Utc>) -> Option<String> {
        if self.hit_ttl_secs == 0 {
            return None;
        }
        let ttl = TimeDelta::try_seconds(i64::try_from(self.hit_ttl_secs).ok()?)?;
        now.checked_sub_signed(ttl).map(iso)
    }

    fn evict_sessions(&self, channel: &mut Channel) -> usize {
        let overflow = channel.sessions.len().saturating_sub(self.max_sessions);
        if overflow == 0 {
            return 0;
        }
        let mut by_age: Vec<(&str, &str, &str)> = channel
            .sessions
            .iter()
            .map(|(id, s)| (s.last_seen.as_str(), s.started_at.as_str(), id.as_str()))
            .collect();
        by_age.sort_unstable();
        let evicted: Vec<String> = by_age
            .into_iter()
            .take(overflow)
            .map(|(_, _, id)| id.to_string())
            .collect();
        for id in &evicted {
            channel.sessions.remove(id);
        }
        evicted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coords, DeviceInfo, Hit, HitKind, Session, SessionStatus, SignalEnvelope};
    use chrono::TimeZone;
    use serde_json::Map;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn hit(n: usize, ts: &str) -> Hit {
        Hit {
            id: format!("{n:08x}"),
            ts: ts.to_string(),
            kind: HitKind::Location,
            ip: "8.8.8.8".to_string(),
            ua: String::new(),
            coords: Coords::gps(n as f64, 0.0, None),
            ip_label: None,
            place: None,
            photo_url: None,
            parent_id: None,
        }
    }

    fn session(id: &str, started_at: &str, last_seen: &str) -> Session {
        Session {
            session_id: id.to_string(),
            started_at: started_at.to_string(),
            last_seen: last_seen.to_string(),
            stopped_at: None,
            status: SessionStatus::Online,
            ip: String::new(),
            ua: String::new(),
            device: DeviceInfo::default(),
        }
    }

    fn envelope(n: usize) -> SignalEnvelope {
        let mut message = Map::new();
        message.insert("n".to_string(), n.into());
        SignalEnvelope {
            ts: "2024-06-01T11:59:00Z".to_string(),
            message,
        }
    }

    fn channel_with_hits(count: usize) -> Channel {
        let mut channel = Channel::new("2024-06-01T00:00:00Z".to_string());
        for n in 1..=count {
            channel.push_hit(hit(n, &format!("2024-06-01T11:00:{n:02}Z")));
        }
        channel
    }

    #[test]
    fn test_hit_cap_keeps_most_recent_in_order() {
        let policy = RetentionPolicy {
            max_hits: 3,
            ..Default::default()
        };
        let mut channel = channel_with_hits(5);

        let report = policy.apply(&mut channel, now());

        assert_eq!(report.hits, 2);
        let ids: Vec<&str> = channel.hits().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["00000003", "00000004", "00000005"]);
        assert!(channel.find_hit("00000001").is_none());
        assert!(channel.find_hit("00000005").is_some());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let policy = RetentionPolicy {
            max_hits: 2,
            max_sessions: 1,
            max_signals: 1,
            hit_ttl_secs: 3600,
        };
        let mut channel = channel_with_hits(4);
        channel
            .sessions
            .insert("a".into(), session("a", "2024-06-01T10:00:00Z", "2024-06-01T10:05:00Z"));
        channel
            .sessions
            .insert("b".into(), session("b", "2024-06-01T10:01:00Z", "2024-06-01T10:09:00Z"));
        channel
            .signals
            .insert("peer".into(), vec![envelope(1), envelope(2)]);

        let first = policy.apply(&mut channel, now());
        assert!(!first.is_empty());
        let snapshot = serde_json::to_value(&channel).unwrap();

        let second = policy.apply(&mut channel, now());
        assert!(second.is_empty());
        assert_eq!(serde_json::to_value(&channel).unwrap(), snapshot);
    }

    #[test]
    fn test_ttl_drops_old_hits_regardless_of_cap() {
        let policy = RetentionPolicy {
            hit_ttl_secs: 600,
            ..Default::default()
        };
        let mut channel = Channel::new("2024-06-01T00:00:00Z".to_string());
        channel.push_hit(hit(1, "2024-06-01T11:00:00Z"));
        channel.push_hit(hit(2, "2024-06-01T11:50:00Z"));
        channel.push_hit(hit(3, "2024-06-01T11:55:00Z"));

        let report = policy.apply(&mut channel, now());

        assert_eq!(report.expired_hits, 1);
        let ids: Vec<&str> = channel.hits().iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["00000002", "00000003"]);
    }

    #[test]
    fn test_ttl_zero_disables_age_check() {
        let policy = RetentionPolicy::default();
        let mut channel = Channel::new("2000-01-01T00:00:00Z".to_string());
        channel.push_hit(hit(1, "2000-01-01T00:00:00Z"));
        assert!(policy.apply(&mut channel, now()).is_empty());
        assert_eq!(channel.hits().len(), 1);
    }

    #[test]
    fn test_session_eviction_by_last_seen_then_started_at() {
        let policy = RetentionPolicy {
            max_sessions: 2,
            ..Default::default()
        };
        let mut channel = Channel::new("2024-06-01T00:00:00Z".to_string());
        channel
            .sessions
            .insert("fresh".into(), session("fresh", "2024-06-01T09:00:00Z", "2024-06-01T11:59:00Z"));
        channel
            .sessions
            .insert("tie-old".into(), session("tie-old", "2024-06-01T08:00:00Z", "2024-06-01T10:00:00Z"));
        channel
            .sessions
            .insert("tie-new".into(), session("tie-new", "2024-06-01T09:30:00Z", "2024-06-01T10:00:00Z"));

        let report = policy.apply(&mut channel, now());

        assert_eq!(report.sessions, 1);
        assert!(channel.sessions.contains_key("fresh"));
        assert!(channel.sessions.contains_key("tie-new"));
        assert!(!channel.sessions.contains_key("tie-old"));
    }

    #[test]
    fn test_signal_queues_capped_per_mailbox() {
        let policy = RetentionPolicy {
            max_signals: 2,
            ..Default::default()
        };
        let mut channel = Channel::new("2024-06-01T00:00:00Z".to_string());
        channel
            .signals
            .insert("a".into(), (1..=4).map(envelope).collect());
        channel.signals.insert("b".into(), vec![envelope(9)]);
        channel.signals.insert("empty".into(), Vec::new());

        let report = policy.apply(&mut channel, now());

        assert_eq!(report.signals, 2);
        let kept: Vec<&serde_json::Value> =
            channel.signals["a"].iter().map(|e| &e.message["n"]).collect();
        assert_eq!(kept, vec![&serde_json::json!(3), &serde_json::json!(4)]);
        assert_eq!(channel.signals["b"].len(), 1);
        assert!(!channel.signals.contains_key("empty"));
    }
}
