use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Outcome of a mutation as reported to API consumers.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpResult {
    pub ok: bool,
}
