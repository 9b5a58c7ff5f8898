// Per-install user token and source-URL augmentation.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{ContentMode, INSTALL_ID_KEY, PUSH_ID_PARAM};
use crate::source::redirect::append_query_param;
use crate::store::traits::KeyValueStore;

const MIN_ID_LEN: usize = 10;
const MAX_ID_LEN: usize = 20;

fn generate_identifier() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(MIN_ID_LEN..=MAX_ID_LEN);
    (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Return the install identifier, generating and persisting it on first use.
pub fn install_identifier(store: &dyn KeyValueStore) -> String {
    if let Some(existing) = store.get_string(INSTALL_ID_KEY) {
        if !existing.is_empty() {
            debug!("using existing install id");
            return existing;
        }
    }
    let id = generate_identifier();
    store.set_string(INSTALL_ID_KEY, &id);
    info!("generated new install id len={}", id.len());
    id
}

/// Append the user token for modes that carry one.
pub fn augment_source_url(url: &str, mode: &ContentMode, install_id: &str) -> String {
    if !mode.wants_user_token() {
        return url.to_string();
    }
    match append_query_param(url, PUSH_ID_PARAM, install_id) {
        Some(augmented) => {
            debug!("source url augmented {} -> {}", url, augmented);
            augmented
        }
        None => {
            warn!("cannot augment unparseable source url: {}", url);
            url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_identifier_is_stable() {
        let store = MemoryStore::new();
        let first = install_identifier(&store);
        assert!(first.len() >= MIN_ID_LEN && first.len() <= MAX_ID_LEN);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(install_identifier(&store), first);
    }

    #[test]
    fn test_augment_by_mode() {
        let url = "https://ex.com/go";
        assert_eq!(
            augment_source_url(url, &ContentMode::Classic, "abc"),
            "https://ex.com/go?push_id=abc"
        );
        assert_eq!(
            augment_source_url(
                url,
                &ContentMode::Privacy {
                    identifier: "id123".into()
                },
                "abc"
            ),
            "https://ex.com/go?push_id=abc"
        );
        assert_eq!(augment_source_url(url, &ContentMode::ClassicNoToken, "abc"), url);
        assert_eq!(augment_source_url(url, &ContentMode::Dropbox, "abc"), url);
        assert_eq!(augment_source_url("", &ContentMode::Classic, "abc"), "");
    }
}
