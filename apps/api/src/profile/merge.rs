//! Identity-key deduplication and merge for the content collections.
//!
//! RULE: after any save or import, no collection may hold two items with the
//! same identity key. A colliding incoming item folds into the existing one
//! in place; it never duplicates and never errors.

use crate::models::profile::{Education, Project, Skill, WorkExperience};

/// An item that can be identified within its collection and folded together
/// with a duplicate.
pub trait Mergeable {
    /// Stable identity within one collection. Built from the fields a user
    /// would recognize as "the same entry", joined with "-".
    fn identity_key(&self) -> String;

    /// Folds an incoming duplicate into `self`: optional scalars take the
    /// incoming value when present, list fields union preserving order.
    fn absorb(&mut self, incoming: Self);
}

impl Mergeable for WorkExperience {
    fn identity_key(&self) -> String {
        format!("{}-{}-{}", self.company, self.position, self.date)
    }

    fn absorb(&mut self, incoming: Self) {
        if incoming.location.is_some() {
            self.location = incoming.location;
        }
        union_into(&mut self.description, incoming.description);
        union_into(&mut self.technologies, incoming.technologies);
    }
}

impl Mergeable for Education {
    fn identity_key(&self) -> String {
        format!("{}-{}-{}", self.school, self.degree, self.field)
    }

    fn absorb(&mut self, incoming: Self) {
        if incoming.location.is_some() {
            self.location = incoming.location;
        }
        if incoming.gpa.is_some() {
            self.gpa = incoming.gpa;
        }
        if !incoming.date.is_empty() {
            self.date = incoming.date;
        }
        union_into(&mut self.achievements, incoming.achievements);
    }
}

impl Mergeable for Project {
    fn identity_key(&self) -> String {
        self.name.clone()
    }

    fn absorb(&mut self, incoming: Self) {
        if incoming.url.is_some() {
            self.url = incoming.url;
        }
        if incoming.github_url.is_some() {
            self.github_url = incoming.github_url;
        }
        if incoming.date.is_some() {
            self.date = incoming.date;
        }
        union_into(&mut self.description, incoming.description);
        union_into(&mut self.technologies, incoming.technologies);
    }
}

impl Mergeable for Skill {
    fn identity_key(&self) -> String {
        self.category.clone()
    }

    fn absorb(&mut self, incoming: Self) {
        union_into(&mut self.items, incoming.items);
    }
}

/// Merges `incoming` into `existing`. Matching identity keys fold in place;
/// new keys append in input order, so existing display order is untouched.
pub fn merge_items<T: Mergeable>(existing: &mut Vec<T>, incoming: Vec<T>) {
    for item in incoming {
        let key = item.identity_key();
        match existing.iter_mut().find(|e| e.identity_key() == key) {
            Some(found) => found.absorb(item),
            None => existing.push(item),
        }
    }
}

/// Collapses duplicate identity keys within a single submitted collection.
/// The first occurrence keeps its position; later duplicates fold into it.
pub fn dedup_items<T: Mergeable>(items: Vec<T>) -> Vec<T> {
    let mut result: Vec<T> = Vec::with_capacity(items.len());
    merge_items(&mut result, items);
    result
}

fn union_into(dst: &mut Vec<String>, src: Vec<String>) {
    for item in src {
        if !dst.contains(&item) {
            dst.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(company: &str, position: &str, date: &str) -> WorkExperience {
        WorkExperience {
            company: company.to_string(),
            position: position.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_keys() {
        let w = work("Acme", "Engineer", "2020-2022");
        assert_eq!(w.identity_key(), "Acme-Engineer-2020-2022");

        let e = Education {
            school: "MIT".to_string(),
            degree: "BSc".to_string(),
            field: "CS".to_string(),
            ..Default::default()
        };
        assert_eq!(e.identity_key(), "MIT-BSc-CS");

        let p = Project {
            name: "resumeforge".to_string(),
            ..Default::default()
        };
        assert_eq!(p.identity_key(), "resumeforge");

        let s = Skill {
            category: "Languages".to_string(),
            items: vec![],
        };
        assert_eq!(s.identity_key(), "Languages");
    }

    #[test]
    fn test_merge_appends_new_keys_in_order() {
        let mut existing = vec![work("Acme", "Engineer", "2020")];
        merge_items(
            &mut existing,
            vec![work("Globex", "SRE", "2021"), work("Initech", "Lead", "2022")],
        );
        let keys: Vec<String> = existing.iter().map(|w| w.identity_key()).collect();
        assert_eq!(
            keys,
            vec!["Acme-Engineer-2020", "Globex-SRE-2021", "Initech-Lead-2022"]
        );
    }

    #[test]
    fn test_merge_folds_duplicate_instead_of_appending() {
        let mut existing = vec![WorkExperience {
            description: vec!["Built the pipeline".to_string()],
            technologies: vec!["Rust".to_string()],
            ..work("Acme", "Engineer", "2020")
        }];

        merge_items(
            &mut existing,
            vec![WorkExperience {
                location: Some("Remote".to_string()),
                description: vec![
                    "Built the pipeline".to_string(),
                    "Cut deploy time in half".to_string(),
                ],
                technologies: vec!["Postgres".to_string()],
                ..work("Acme", "Engineer", "2020")
            }],
        );

        assert_eq!(existing.len(), 1);
        let merged = &existing[0];
        assert_eq!(merged.location.as_deref(), Some("Remote"));
        // Union keeps order and drops the repeated line.
        assert_eq!(
            merged.description,
            vec!["Built the pipeline", "Cut deploy time in half"]
        );
        assert_eq!(merged.technologies, vec!["Rust", "Postgres"]);
    }

    #[test]
    fn test_merge_never_leaves_duplicate_keys() {
        let mut existing = vec![work("Acme", "Engineer", "2020")];
        merge_items(
            &mut existing,
            vec![
                work("Acme", "Engineer", "2020"),
                work("Acme", "Engineer", "2020"),
                work("Globex", "SRE", "2021"),
            ],
        );

        let mut keys: Vec<String> = existing.iter().map(|w| w.identity_key()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_merge_scalar_absent_keeps_existing() {
        let mut existing = vec![WorkExperience {
            location: Some("Berlin".to_string()),
            ..work("Acme", "Engineer", "2020")
        }];
        merge_items(&mut existing, vec![work("Acme", "Engineer", "2020")]);
        assert_eq!(existing[0].location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_skill_items_union() {
        let mut existing = vec![Skill {
            category: "Languages".to_string(),
            items: vec!["Rust".to_string(), "Go".to_string()],
        }];
        merge_items(
            &mut existing,
            vec![Skill {
                category: "Languages".to_string(),
                items: vec!["Go".to_string(), "Python".to_string()],
            }],
        );
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].items, vec!["Rust", "Go", "Python"]);
    }

    #[test]
    fn test_education_gpa_fills_in() {
        let mut existing = vec![Education {
            school: "MIT".to_string(),
            degree: "BSc".to_string(),
            field: "CS".to_string(),
            ..Default::default()
        }];
        merge_items(
            &mut existing,
            vec![Education {
                school: "MIT".to_string(),
                degree: "BSc".to_string(),
                field: "CS".to_string(),
                gpa: Some(3.9),
                ..Default::default()
            }],
        );
        assert_eq!(existing[0].gpa, Some(3.9));
    }

    #[test]
    fn test_dedup_keeps_first_position() {
        let items = vec![
            work("Acme", "Engineer", "2020"),
            work("Globex", "SRE", "2021"),
            work("Acme", "Engineer", "2020"),
        ];
        let deduped = dedup_items(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].identity_key(), "Acme-Engineer-2020");
        assert_eq!(deduped[1].identity_key(), "Globex-SRE-2021");
    }

    #[test]
    fn test_dedup_empty() {
        let deduped: Vec<Project> = dedup_items(vec![]);
        assert!(deduped.is_empty());
    }
}
