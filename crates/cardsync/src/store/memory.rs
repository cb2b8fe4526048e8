use super::card_store::CardStore;
use super::mem_backend::MemBackend;

pub type InMemoryCardStore = CardStore<MemBackend>;

impl Default for InMemoryCardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        CardStore::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{ContactFields, ContactRecord, NewContact};
    use crate::store::LocalStore;

    pub struct StoreFixture {
        pub store: InMemoryCardStore,
        pub owner: String,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new("owner-1")
        }
    }

    impl StoreFixture {
        pub fn new(owner: &str) -> Self {
            Self {
                store: InMemoryCardStore::new(),
                owner: owner.to_string(),
            }
        }

        pub fn with_cached(self, id: &str, name: &str) -> Self {
            let fields = ContactFields {
                name: name.into(),
                ..Default::default()
            };
            let record = ContactRecord::from_new(id, self.owner.as_str(), &NewContact::new(fields));
            self.store.cache_one(&record).unwrap();
            self
        }

        pub fn with_pending(self, name: &str) -> Self {
            let payload = NewContact::new(ContactFields {
                name: name.into(),
                ..Default::default()
            })
            .stamped();
            let write = self.store.enqueue_pending(&self.owner, &payload).unwrap();
            self.store.cache_one(&write.placeholder()).unwrap();
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::StoreFixture;
    use crate::store::LocalStore;

    #[test]
    fn test_fixture_populates_both_tables() {
        let fixture = StoreFixture::default()
            .with_cached("c1", "Confirmed")
            .with_pending("Queued");

        let cached = fixture.store.get_cached(&fixture.owner).unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(fixture.store.list_pending(None).unwrap().len(), 1);
        assert!(cached.iter().any(|r| r.is_pending()));
    }
}
