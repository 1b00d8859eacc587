//! Property-based test generators using proptest.
//!
//! Generated contact batches always satisfy the store's uniqueness rules,
//! so every contact in a batch can be added.

use proptest::prelude::*;

/// A contact to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSpec {
    /// Name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Remark; non-blank whenever the name repeats an earlier one.
    pub remark: String,
}

/// One step of a random workload.
#[derive(Debug, Clone)]
pub enum Op {
    /// Add a contact; may be rejected.
    Add(ContactSpec),
    /// Delete by name; may miss.
    Delete(String),
    /// Change the phone of the first contact with the name.
    EditPhone(String, String),
    /// Drop and reopen the engine.
    Reopen,
}

/// Strategy for contact names, drawn from a small alphabet so prefixes
/// collide.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ABab][a-c]{0,5}").expect("Invalid regex")
}

/// Strategy for phone numbers.
pub fn phone_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-3]{1,6}").expect("Invalid regex")
}

/// Strategy for a batch of up to `max` contacts with distinct phones.
///
/// Repeated names carry a remark so they pass validation.
pub fn contact_batch_strategy(max: usize) -> impl Strategy<Value = Vec<ContactSpec>> {
    prop::collection::btree_map(phone_strategy(), name_strategy(), 1..=max.max(1)).prop_map(
        |by_phone| {
            let mut seen = std::collections::BTreeSet::new();
            by_phone
                .into_iter()
                .enumerate()
                .map(|(i, (phone, name))| {
                    let remark = if seen.insert(name.clone()) {
                        String::new()
                    } else {
                        format!("dup {i}")
                    };
                    ContactSpec {
                        name,
                        phone,
                        remark,
                    }
                })
                .collect()
        },
    )
}

/// Strategy for a workload of up to `max` operations.
pub fn op_strategy(max: usize) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        4 => (name_strategy(), phone_strategy(), prop::bool::ANY).prop_map(
            |(name, phone, remarked)| Op::Add(ContactSpec {
                name,
                phone,
                remark: if remarked { "r".to_string() } else { String::new() },
            })
        ),
        2 => name_strategy().prop_map(Op::Delete),
        1 => (name_strategy(), phone_strategy()).prop_map(|(n, p)| Op::EditPhone(n, p)),
        1 => Just(Op::Reopen),
    ];
    prop::collection::vec(op, 0..=max)
}
