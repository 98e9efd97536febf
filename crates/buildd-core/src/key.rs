//! Signing key selection from a `gpg --with-colons` listing

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// Keys expiring sooner than this are never used for signing.
pub const MIN_KEY_VALIDITY_SECS: i64 = 24 * 60 * 60;

/// A signing identity that is valid right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Long key ID as printed by gpg
    pub keyid: String,
    /// Time left until the key expires
    pub expiry: Duration,
    /// Address from the key's most recent user ID
    pub email: Option<String>,
}

impl Key {
    pub fn new(keyid: impl Into<String>, expiry: Duration, email: Option<String>) -> Self {
        Self { keyid: keyid.into(), expiry, email }
    }
}

fn angle_address_regex() -> &'static Regex {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    ADDRESS.get_or_init(|| Regex::new(r"<([^<>\s]+@[^<>\s]+)>").expect("Valid regex"))
}

/// Extract the email address of a user ID such as `Name <user@host>`.
pub fn parse_email(uid: &str) -> Option<String> {
    if let Some(captures) = angle_address_regex().captures(uid) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }

    let bare = uid.trim();
    if bare.contains('@') && !bare.contains(char::is_whitespace) {
        Some(bare.to_string())
    } else {
        None
    }
}

/// Pick the key to sign with.
///
/// Several secret keys may be present: some already expired, some freshly
/// generated. Keys with less than a day of validity left are rejected. Among
/// the rest the one closest to expiry wins, since a much newer key may not be
/// known to the archive yet. Keys without an expiry date are ignored.
pub fn select_active_key(listing: &str, now: DateTime<Utc>) -> Result<Key> {
    let min_validity = Duration::seconds(MIN_KEY_VALIDITY_SECS);
    let mut keys: Vec<Key> = Vec::new();
    // Index into `keys` of the key the following uid records belong to.
    let mut current: Option<usize> = None;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("sec") => {
                current = None;
                let (Some(keyid), Some(expires)) = (fields.get(4), fields.get(6)) else {
                    return Err(Error::InvalidKeyListing {
                        reason: format!("truncated secret key record: {line}"),
                    });
                };

                let Ok(expires) = expires.parse::<i64>() else {
                    debug!("Skipping key {} without usable expiry '{}'", keyid, expires);
                    continue;
                };
                let Some(expires) = DateTime::<Utc>::from_timestamp(expires, 0) else {
                    debug!("Skipping key {} with out of range expiry", keyid);
                    continue;
                };

                let remaining = expires - now;
                if remaining < min_validity {
                    debug!("Skipping key {}: expires in {}s", keyid, remaining.num_seconds());
                    continue;
                }

                keys.push(Key::new(*keyid, remaining, None));
                current = Some(keys.len() - 1);
            }
            Some("uid") => {
                if let (Some(index), Some(uid)) = (current, fields.get(9)) {
                    if let Some(email) = parse_email(uid) {
                        keys[index].email = Some(email);
                    }
                }
            }
            _ => {}
        }
    }

    keys.into_iter()
        .min_by_key(|key| key.expiry)
        .ok_or(Error::KeyNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    // B424EB74051F4844 expired long ago. DFE4C0B481F37BDB is the key in use
    // at the reference time, 135DC390E4032D36 its already valid successor.
    const GPG_KEYLIST: &str = "\
sec:e:4096:1:B424EB74051F4844:1398721900:1430257900::u:::sc:::+::::
rvk:::1::::::F75FBFCD771DEB5E9C86050550C3634D3A291CF9:80:
fpr:::::::::091BC8E250417B2041F990ACB424EB74051F4844:
grp:::::::::2FF5C26CCC68B2EB11D375867645326471566E1B:
uid:e::::1398721900::846EE2E487D23670F70426952DD6DBEC80B2CE92::old key <old@example.com>:
sec:e:4096:1:DFE4C0B481F37BDB:1468787574:1500323574::u:::sc:::+::::
rvk:::1::::::F75FBFCD771DEB5E9C86050550C3634D3A291CF9:80:
fpr:::::::::4881416785E6EE2DB59A5C72DFE4C0B481F37BDB:
grp:::::::::FB514081A41735566929601BD58899ABAFA56139:
uid:e::::1468787574::846EE2E487D23670F70426952DD6DBEC80B2CE92::buildd key <buildd_arch-hostname@example.com>:
sec:u:4096:1:135DC390E4032D36:1499637849:1531173849::u:::scSC:::+::::
fpr:::::::::69C17C61AF2936B6C0FD18C4135DC390E4032D36:
grp:::::::::7FFC1B09E39CCB591264F8B8D708B0A624526ACD:
uid:u::::1499637849::846EE2E487D23670F70426952DD6DBEC80B2CE92::buildd key <buildd_arch-hostname@example.com>:
";

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, nanos).unwrap()
    }

    #[test]
    fn test_picks_key_closest_to_expiry() {
        let key = select_active_key(GPG_KEYLIST, at(1_500_000_000, 0)).unwrap();
        assert_eq!(key.keyid, "DFE4C0B481F37BDB");
        assert_eq!(key.expiry, Duration::seconds(1_500_323_574 - 1_500_000_000));
        assert_eq!(key.email.as_deref(), Some("buildd_arch-hostname@example.com"));
    }

    #[test]
    fn test_picks_successor_after_expiry() {
        let key = select_active_key(GPG_KEYLIST, at(1_518_458_890, 395_519_000)).unwrap();
        assert_eq!(key.keyid, "135DC390E4032D36");
        assert_eq!(
            key.expiry,
            Duration::seconds(1_531_173_849 - 1_518_458_891) + Duration::nanoseconds(604_481_000)
        );
        assert_eq!(key.email.as_deref(), Some("buildd_arch-hostname@example.com"));
    }

    #[test]
    fn test_no_key_left() {
        let result = select_active_key(GPG_KEYLIST, at(1_549_994_890, 395_519_000));
        assert!(matches!(result, Err(Error::KeyNotFound)));
    }

    #[test]
    fn test_rejects_key_expiring_within_a_day() {
        // DFE4C0B481F37BDB has 12 hours left; the successor must win.
        let key = select_active_key(GPG_KEYLIST, at(1_500_323_574 - 12 * 3600, 0)).unwrap();
        assert_eq!(key.keyid, "135DC390E4032D36");
    }

    #[test]
    fn test_uid_after_rejected_key_is_ignored() {
        let listing = "\
sec:u:4096:1:AAAAAAAAAAAAAAAA:1:2000000000::u:::sc:::+::::
uid:u::::1::X::first <first@example.com>:
sec:e:4096:1:BBBBBBBBBBBBBBBB:1:1000::u:::sc:::+::::
uid:e::::1::X::expired <expired@example.com>:
";
        let key = select_active_key(listing, at(1_500_000_000, 0)).unwrap();
        assert_eq!(key.keyid, "AAAAAAAAAAAAAAAA");
        assert_eq!(key.email.as_deref(), Some("first@example.com"));
    }

    #[test]
    fn test_key_without_expiry_is_skipped() {
        let listing = "sec:u:4096:1:CCCCCCCCCCCCCCCC:1:::u:::sc:::+::::\n";
        assert!(matches!(
            select_active_key(listing, at(1_500_000_000, 0)),
            Err(Error::KeyNotFound)
        ));
    }

    #[test]
    fn test_parse_email() {
        assert_eq!(parse_email("buildd key <a@b.org>").as_deref(), Some("a@b.org"));
        assert_eq!(parse_email("a@b.org").as_deref(), Some("a@b.org"));
        assert_eq!(parse_email("no address here"), None);
    }
}
