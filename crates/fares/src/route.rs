use serde::{Deserialize, Serialize};

use transitgate_core::{Entity, RouteId};

/// Transit route as seen by the fare engine.
///
/// Routes are owned by the route/bus administration collaborator; the
/// engine only needs to know whether one exists and is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub active: bool,
}

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RouteId::new(),
            name: name.into(),
            active: true,
        }
    }
}

impl Entity for Route {
    type Id = RouteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
