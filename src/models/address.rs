use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which slot of the address book an address lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Home,
    Work,
}

impl AddressKind {
    /// Field name of the slot inside the user document.
    pub fn field(self) -> &'static str {
        match self {
            AddressKind::Home => "home",
            AddressKind::Work => "work",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub address_id: ObjectId,
    pub house: String,
    pub street: String,
    pub city: String,
    pub pin_code: String,
}

impl Address {
    pub fn new(address_id: ObjectId, fields: AddressFields) -> Self {
        Address {
            address_id,
            house: fields.house,
            street: fields.street,
            city: fields.city,
            pin_code: fields.pin_code,
        }
    }
}

/// Request body for the address endpoints.
#[derive(Deserialize, Debug, Clone)]
pub struct AddressFields {
    pub house: String,
    pub street: String,
    pub city: String,
    pub pin_code: String,
}

impl AddressFields {
    pub fn validate(&self) -> Result<(), AppError> {
        let missing = [
            ("house", &self.house),
            ("street", &self.street),
            ("city", &self.city),
            ("pin_code", &self.pin_code),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match missing {
            Some((name, _)) => Err(AppError::Validation(format!("{} is required", name))),
            None => Ok(()),
        }
    }
}

/// The two keyed address slots of a user.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    pub home: Option<Address>,
    pub work: Option<Address>,
}

impl AddressBook {
    pub fn get(&self, kind: AddressKind) -> Option<&Address> {
        match kind {
            AddressKind::Home => self.home.as_ref(),
            AddressKind::Work => self.work.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: AddressKind) -> &mut Option<Address> {
        match kind {
            AddressKind::Home => &mut self.home,
            AddressKind::Work => &mut self.work,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddressView {
    pub address_id: String,
    pub house: String,
    pub street: String,
    pub city: String,
    pub pin_code: String,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        AddressView {
            address_id: address.address_id.to_hex(),
            house: address.house.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            pin_code: address.pin_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_missing_field() {
        let fields = AddressFields {
            house: "12".into(),
            street: " ".into(),
            city: "".into(),
            pin_code: "411001".into(),
        };
        match fields.validate() {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "street is required"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn slots_are_addressed_by_kind() {
        let mut book = AddressBook::default();
        let address = Address {
            address_id: ObjectId::new(),
            house: "1".into(),
            street: "Main".into(),
            city: "Pune".into(),
            pin_code: "411001".into(),
        };
        *book.slot_mut(AddressKind::Work) = Some(address.clone());
        assert!(book.get(AddressKind::Home).is_none());
        assert_eq!(book.get(AddressKind::Work), Some(&address));
    }

    #[test]
    fn view_reads_back_from_json() {
        let address = Address {
            address_id: ObjectId::new(),
            house: "12".into(),
            street: "MG Road".into(),
            city: "Pune".into(),
            pin_code: "411001".into(),
        };
        let view = AddressView::from(&address);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(&address.address_id.to_hex()));

        let parsed: AddressView = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, view);
    }
}
