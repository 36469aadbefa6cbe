//! Post-condition applied to every reducer result before a job may succeed.

/// A result is kept only when it is strictly smaller than the original.
/// Equal size counts as no improvement.
pub fn accept(original_size: u64, result_size: u64) -> bool {
    result_size < original_size
}
