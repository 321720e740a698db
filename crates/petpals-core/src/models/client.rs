//! Client model

use serde::{Deserialize, Serialize};

use super::{Record, RecordId};
use crate::store::Direction;

/// A pet-sitting customer and the pet being looked after
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Client {
    /// Store-assigned identifier (empty until first written)
    pub id: RecordId,
    pub address: String,
    /// Business reference number; list views sort by it
    pub customer_number: String,
    pub feeding_routine: String,
    pub health: String,
    /// Owner name
    pub name: String,
    pub other: String,
    pub pet_name: String,
}

impl Client {
    /// Pet name carried by generated placeholder clients
    pub const DUMMY_PET_NAME: &'static str = "Dummy";

    /// Create an unsaved client
    pub fn new(
        customer_number: impl Into<String>,
        name: impl Into<String>,
        pet_name: impl Into<String>,
    ) -> Self {
        Self {
            customer_number: customer_number.into(),
            name: name.into(),
            pet_name: pet_name.into(),
            ..Self::default()
        }
    }

    /// Build the `index`th placeholder client used to exercise paging
    #[must_use]
    pub fn dummy(index: usize) -> Self {
        Self {
            id: RecordId::default(),
            address: format!("Dummy A {index}"),
            customer_number: format!("Dummy CN {index}"),
            feeding_routine: format!("Dummy fr {index}"),
            health: format!("Dummy h {index}"),
            name: format!("Dummy n {index}"),
            other: format!("Dummy o {index}"),
            pet_name: Self::DUMMY_PET_NAME.to_string(),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.pet_name == Self::DUMMY_PET_NAME
    }

    /// One-line label for list output
    pub fn display_label(&self) -> String {
        match (self.name.trim(), self.pet_name.trim()) {
            ("", "") => self.customer_number.clone(),
            (name, "") => name.to_string(),
            ("", pet) => pet.to_string(),
            (name, pet) => format!("{name} ({pet})"),
        }
    }
}

impl Record for Client {
    const COLLECTION: &'static str = "clients";
    const SORT_FIELD: &'static str = "customerNumber";
    const SORT_DIRECTION: Direction = Direction::Ascending;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }
}
