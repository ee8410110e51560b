//! A mention: a token span in a document believed to refer to some entity.

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// A span of tokens bound to a currently-believed entity.
///
/// `name` is the surface form and may differ from `entity.name` after
/// coreference resolution rewrites the believed entity. Mentions order by
/// document position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mention {
    /// Position of the first token of this mention.
    pub start: usize,
    /// Position of the last token of this mention.
    pub end: usize,
    /// Surface form as it appears in the text.
    pub name: String,
    /// The entity this mention is currently believed to refer to.
    pub entity: Entity,
}

impl Mention {
    /// Create a mention whose surface form is the entity's name.
    pub fn new(entity: Entity, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            name: entity.name.clone(),
            entity,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl std::fmt::Display for Mention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{} '{}' -> {}", self.start, self.end, self.name, self.entity.name)
    }
}

/// Propagate full person names onto shorter mentions of the same person.
///
/// When one mention's believed name strictly contains another's ("Barack
/// Obama" vs "Obama") and the longer one is a person, the shorter mention's
/// believed entity is rewritten to the full name. Mentions whose surface form
/// already differs from their entity name are left alone — coreference has
/// resolved them upstream.
pub fn propagate_person_names(mentions: &mut [Mention]) {
    if mentions.is_empty() {
        return;
    }

    for i in 0..mentions.len() {
        let name1 = mentions[i].entity.name.clone();
        if mentions[i].name != name1 {
            continue;
        }

        for j in i..mentions.len() {
            let name2 = mentions[j].entity.name.clone();

            if name1.contains(&name2) && name1.len() > name2.len() {
                // full name: name1, short name: name2
                if mentions[i].entity.kind == EntityKind::Person {
                    mentions[j].entity.name = name1.clone();
                }
            } else if name2.contains(&name1) && name1.len() < name2.len() {
                // full name: name2, short name: name1
                if mentions[j].entity.kind == EntityKind::Person {
                    mentions[i].entity.name = name2;
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, start: usize) -> Mention {
        Mention::new(Entity::with_kind(name, EntityKind::Person), start, start + 1)
    }

    #[test]
    fn test_orders_by_position() {
        let a = Mention::new(Entity::new("A"), 4, 5);
        let b = Mention::new(Entity::new("B"), 2, 3);
        assert!(b < a);
    }

    #[test]
    fn test_short_person_name_expanded() {
        let mut mentions = vec![person("Barack Obama", 0), person("Obama", 10)];
        propagate_person_names(&mut mentions);
        assert_eq!(mentions[1].entity.name, "Barack Obama");
        // surface form is untouched
        assert_eq!(mentions[1].name, "Obama");
    }

    #[test]
    fn test_expansion_works_in_either_order() {
        let mut mentions = vec![person("Obama", 0), person("Barack Obama", 10)];
        propagate_person_names(&mut mentions);
        assert_eq!(mentions[0].entity.name, "Barack Obama");
    }

    #[test]
    fn test_non_person_untouched() {
        let mut mentions = vec![
            Mention::new(Entity::with_kind("Air Canada", EntityKind::Organization), 0, 1),
            Mention::new(Entity::with_kind("Canada", EntityKind::Location), 5, 6),
        ];
        propagate_person_names(&mut mentions);
        assert_eq!(mentions[1].entity.name, "Canada");
    }
}
