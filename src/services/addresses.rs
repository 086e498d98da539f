//! The home and work address slots of a user.

use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::error::AppError;
use crate::models::{Address, AddressFields, AddressKind};
use crate::store::Database;

#[derive(Clone)]
pub struct AddressService {
    db: Database,
}

impl AddressService {
    pub fn new(db: Database) -> Self {
        AddressService { db }
    }

    /// Stores the address in the first free slot, home before work. Fails
    /// with a conflict once both slots are taken.
    pub async fn add_address(
        &self,
        user_id: &ObjectId,
        fields: AddressFields,
    ) -> Result<Address, AppError> {
        fields.validate()?;
        let address = Address::new(ObjectId::new(), fields);

        for kind in [AddressKind::Home, AddressKind::Work] {
            let filled = self
                .db
                .run(
                    "fill_empty_address_slot",
                    self.db
                        .store()
                        .fill_empty_address_slot(user_id, kind, &address),
                )
                .await?;
            if filled {
                info!(user_id = %user_id, slot = kind.field(), "Address added");
                return Ok(address);
            }
        }

        let exists = self
            .db
            .run("find_user", self.db.store().find_user(user_id))
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound("user"));
        }
        Err(AppError::Conflict("not allowed: both address slots are in use".into()))
    }

    /// Replaces the address in the given slot. An existing address keeps its
    /// id; an empty slot gets a new one.
    pub async fn edit_address(
        &self,
        user_id: &ObjectId,
        kind: AddressKind,
        fields: AddressFields,
    ) -> Result<Address, AppError> {
        fields.validate()?;
        let user = self
            .db
            .run("find_user", self.db.store().find_user(user_id))
            .await?
            .ok_or(AppError::NotFound("user"))?;

        let address_id = user
            .addresses
            .get(kind)
            .map(|existing| existing.address_id)
            .unwrap_or_else(ObjectId::new);
        let address = Address::new(address_id, fields);

        let matched = self
            .db
            .run(
                "set_address",
                self.db.store().set_address(user_id, kind, &address),
            )
            .await?;
        if !matched {
            return Err(AppError::NotFound("user"));
        }
        info!(user_id = %user_id, slot = kind.field(), "Address updated");
        Ok(address)
    }

    pub async fn clear_addresses(&self, user_id: &ObjectId) -> Result<(), AppError> {
        let matched = self
            .db
            .run("clear_addresses", self.db.store().clear_addresses(user_id))
            .await?;
        if !matched {
            return Err(AppError::NotFound("user"));
        }
        info!(user_id = %user_id, "Addresses cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{memory_database, seed_user};

    fn fields(city: &str) -> AddressFields {
        AddressFields {
            house: "12".into(),
            street: "MG Road".into(),
            city: city.into(),
            pin_code: "411001".into(),
        }
    }

    #[tokio::test]
    async fn fills_home_then_work_then_refuses() {
        let db = memory_database();
        let addresses = AddressService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;

        let home = addresses.add_address(&user.id, fields("Pune")).await.unwrap();
        let work = addresses.add_address(&user.id, fields("Mumbai")).await.unwrap();
        assert!(matches!(
            addresses.add_address(&user.id, fields("Delhi")).await,
            Err(AppError::Conflict(_))
        ));

        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.addresses.home, Some(home));
        assert_eq!(stored.addresses.work, Some(work));
    }

    #[tokio::test]
    async fn edit_keeps_address_id_and_clear_empties_both_slots() {
        let db = memory_database();
        let addresses = AddressService::new(db.clone());
        let user = seed_user(&db, "asha@example.com", "111").await;

        let home = addresses.add_address(&user.id, fields("Pune")).await.unwrap();
        let edited = addresses
            .edit_address(&user.id, AddressKind::Home, fields("Nashik"))
            .await
            .unwrap();
        assert_eq!(edited.address_id, home.address_id);
        assert_eq!(edited.city, "Nashik");

        // An empty work slot can be edited into existence.
        let work = addresses
            .edit_address(&user.id, AddressKind::Work, fields("Mumbai"))
            .await
            .unwrap();
        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.addresses.work, Some(work));

        addresses.clear_addresses(&user.id).await.unwrap();
        let stored = db.store().find_user(&user.id).await.unwrap().unwrap();
        assert!(stored.addresses.home.is_none());
        assert!(stored.addresses.work.is_none());
    }

    #[tokio::test]
    async fn unknown_user_and_blank_fields_are_rejected() {
        let db = memory_database();
        let addresses = AddressService::new(db.clone());

        assert!(matches!(
            addresses.add_address(&ObjectId::new(), fields("Pune")).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(
            addresses.clear_addresses(&ObjectId::new()).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(
            addresses.add_address(&ObjectId::new(), fields(" ")).await,
            Err(AppError::Validation(_))
        ));
    }
}
