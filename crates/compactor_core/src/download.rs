use crate::Family;

const REDUCED_PREFIX: &str = "min_";

/// A finished result ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Suggested output name. Archives gain a `.zip` suffix; everything else keeps its
/// name and format behind a short prefix.
pub fn download_name(family: Family, source_name: &str) -> String {
    match family {
        Family::Archive => format!("{source_name}.zip"),
        _ => format!("{REDUCED_PREFIX}{source_name}"),
    }
}
