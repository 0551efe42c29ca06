use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MINUTES: u32 = 10;

/// The drive labels a pair can be mapped to.
pub const DRIVE_LETTERS: [&str; 26] = [
    "A:", "B:", "C:", "D:", "E:", "F:", "G:", "H:", "I:", "J:", "K:", "L:", "M:",
    "N:", "O:", "P:", "Q:", "R:", "S:", "T:", "U:", "V:", "W:", "X:", "Y:", "Z:",
];

pub fn is_drive_letter(label: &str) -> bool {
    DRIVE_LETTERS.contains(&label)
}

/// A pair as edited by the user. Either field may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditablePair {
    pub drive_letter: String,
    pub path: String,
}

impl EditablePair {
    pub fn new(drive_letter: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            drive_letter: drive_letter.into(),
            path: path.into(),
        }
    }
}

/// A complete drive letter to path mapping request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrivePathPair {
    drive_letter: String,
    path: String,
}

impl DrivePathPair {
    /// Returns `None` if either field is empty.
    pub fn new(drive_letter: impl Into<String>, path: impl Into<String>) -> Option<Self> {
        let drive_letter = drive_letter.into();
        let path = path.into();
        if drive_letter.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self { drive_letter, path })
    }

    pub fn drive_letter(&self) -> &str {
        &self.drive_letter
    }

    /// The unresolved path, tokens included.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl From<&DrivePathPair> for EditablePair {
    fn from(pair: &DrivePathPair) -> Self {
        EditablePair::new(pair.drive_letter.clone(), pair.path.clone())
    }
}

/// An immutable batch of pairs plus the time the mappings may stay alive.
///
/// Incomplete pairs are dropped on construction; the order of the remaining
/// pairs is kept. A new connect builds a new set instead of editing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConnectionSetDoc", into = "ConnectionSetDoc")]
pub struct ConnectionSet {
    timeout_minutes: u32,
    connections: Vec<DrivePathPair>,
}

impl Default for ConnectionSet {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            connections: Vec::new(),
        }
    }
}

impl ConnectionSet {
    pub fn new<'a, I>(pairs: I, timeout_minutes: u32) -> Self
    where
        I: IntoIterator<Item = &'a EditablePair>,
    {
        let connections = pairs
            .into_iter()
            .filter_map(|p| DrivePathPair::new(p.drive_letter.as_str(), p.path.as_str()))
            .collect();
        Self {
            timeout_minutes,
            connections,
        }
    }

    pub fn timeout_minutes(&self) -> u32 {
        self.timeout_minutes
    }

    pub fn connections(&self) -> &[DrivePathPair] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Editable copies of the pairs, for loading a saved set back into a form.
    pub fn to_editable(&self) -> Vec<EditablePair> {
        self.connections.iter().map(EditablePair::from).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionSetDoc {
    timeout_minutes: u32,
    connections: CountedDoc<PairDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PairDoc {
    drive: String,
    path: String,
}

/// A collection written with its element count in front of it. An empty
/// collection carries only `count: 0` and no entry list.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CountedDoc<T> {
    pub(crate) count: usize,
    #[serde(
        rename = "items",
        default = "Vec::new",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub(crate) items: Vec<T>,
}

impl<T> CountedDoc<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }

    /// Reads exactly `count` entries.
    pub(crate) fn into_items(self, what: &str) -> Result<Vec<T>, String> {
        if self.count == 0 {
            return Ok(Vec::new());
        }
        if self.items.len() != self.count {
            return Err(format!(
                "expected {} {what} entries, found {}",
                self.count,
                self.items.len()
            ));
        }
        Ok(self.items)
    }
}

impl From<ConnectionSet> for ConnectionSetDoc {
    fn from(set: ConnectionSet) -> Self {
        let pairs = set
            .connections
            .into_iter()
            .map(|p| PairDoc {
                drive: p.drive_letter,
                path: p.path,
            })
            .collect();
        ConnectionSetDoc {
            timeout_minutes: set.timeout_minutes,
            connections: CountedDoc::new(pairs),
        }
    }
}

impl TryFrom<ConnectionSetDoc> for ConnectionSet {
    type Error = String;

    fn try_from(doc: ConnectionSetDoc) -> Result<Self, Self::Error> {
        let pairs: Vec<EditablePair> = doc
            .connections
            .into_items("connection")?
            .into_iter()
            .map(|p| EditablePair::new(p.drive, p.path))
            .collect();
        Ok(ConnectionSet::new(&pairs, doc.timeout_minutes))
    }
}
