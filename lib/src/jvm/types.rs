use super::Error;
use std::iter::Peekable;
use std::str::Chars;

/// One formal type slot of a field or method: the erased descriptor type paired with its generic
/// counterpart (if a generic signature was available)
///
/// Given the method
///
/// ```java,ignore,no_run
/// static <T> T test(java.util.ArrayList<T> a, java.util.List<java.lang.String> b)
/// ```
///
/// which compiles to descriptor `(Ljava/util/ArrayList;Ljava/util/List;)Ljava/lang/Object;` with
/// signature `<T:Ljava/lang/Object;>(Ljava/util/ArrayList<TT;>;Ljava/util/List<Ljava/lang/String;>;)TT;`,
/// there are three slots:
///
/// | real                    | generic                                 |
/// |-------------------------|-----------------------------------------|
/// | `Ljava/util/ArrayList;` | `Ljava/util/ArrayList<TT;>;`            |
/// | `Ljava/util/List;`      | `Ljava/util/List<Ljava/lang/String;>;`  |
/// | `Ljava/lang/Object;`    | `TT;`                                   |
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeEntry {
    pub real: String,
    pub generic: Option<String>,
}

impl TypeEntry {
    pub fn new(real: impl Into<String>) -> TypeEntry {
        TypeEntry {
            real: real.into(),
            generic: None,
        }
    }

    /// Split a descriptor (and optionally its generic signature, in lockstep) into type slots
    ///
    /// For methods, the parameters come first and the return type is the last entry.
    pub fn decompose(descriptor: &str, signature: Option<&str>) -> Result<Vec<TypeEntry>, Error> {
        let real_types = split_types(descriptor)?;
        let generic_types = match signature {
            None => None,
            Some(signature) => {
                let generic_types = split_types(signature)?;
                if generic_types.len() != real_types.len() {
                    return Err(Error::SignatureMismatch {
                        descriptor: descriptor.to_owned(),
                        signature: signature.to_owned(),
                    });
                }
                Some(generic_types)
            }
        };

        let mut generic_types = generic_types.map(Vec::into_iter);
        Ok(real_types
            .into_iter()
            .map(|real| TypeEntry {
                real,
                generic: generic_types.as_mut().and_then(Iterator::next),
            })
            .collect())
    }

    /// Anything which isn't a class type (this includes arrays)
    pub fn is_primitive(&self) -> bool {
        !self.real.starts_with('L')
    }

    /// Class name in Java source form (eg. `java.lang.String`)
    pub fn class_name(&self) -> Result<String, Error> {
        if self.is_primitive() {
            return Err(Error::PrimitiveClassName(self.real.clone()));
        }
        Ok(self.real[1..self.real.len() - 1].replace('/', "."))
    }

    pub fn generic_or_real(&self) -> &str {
        self.generic.as_deref().unwrap_or(&self.real)
    }

    /// How the erased type would be written in Java source (eg. `int[]` or `java.util.List`)
    pub fn java_name(&self) -> String {
        let element = self.real.trim_start_matches('[');
        let dimensions = self.real.len() - element.len();
        let mut name = match element {
            "Z" => String::from("boolean"),
            "C" => String::from("char"),
            "B" => String::from("byte"),
            "S" => String::from("short"),
            "I" => String::from("int"),
            "F" => String::from("float"),
            "J" => String::from("long"),
            "D" => String::from("double"),
            "V" => String::from("void"),
            other => other[1..other.len() - 1].replace('/', "."),
        };
        for _ in 0..dimensions {
            name.push_str("[]");
        }
        name
    }
}

/// Split a field/method descriptor or generic signature into its type slots
///
/// Formal type parameters (`<T:...>`) at the start of a method signature and any `throws`
/// clauses (`^...`) at the end are skipped. Class types may carry nested type argument lists
/// which themselves contain `;`-terminated types, so `;` only ends a class type when it is not
/// nested inside `<...>`.
pub fn split_types(descriptor: &str) -> Result<Vec<String>, Error> {
    let bad = |reason: String| Error::BadDescriptor {
        descriptor: descriptor.to_owned(),
        reason,
    };

    let mut source = descriptor.chars().peekable();
    let mut types = vec![];
    let mut current = String::new();

    if source.peek() == Some(&'<') {
        skip_type_parameters(&mut source).map_err(bad)?;
    }

    while let Some(c) = source.next() {
        match c {
            '(' | ')' if current.is_empty() => (),
            '^' if current.is_empty() => break,
            'Z' | 'C' | 'B' | 'S' | 'I' | 'F' | 'J' | 'D' | 'V' => {
                current.push(c);
                types.push(std::mem::take(&mut current));
            }
            '[' => current.push('['),
            'T' | 'L' => {
                current.push(c);
                read_reference(&mut source, &mut current).map_err(bad)?;
                types.push(std::mem::take(&mut current));
            }
            other => return Err(bad(format!("unexpected character '{}'", other))),
        }
    }

    if !current.is_empty() {
        return Err(bad(String::from("array marker without element type")));
    }
    Ok(types)
}

/// Read the rest of a class type or type variable, up to and including the terminating `;`
fn read_reference(source: &mut Peekable<Chars>, into: &mut String) -> Result<(), String> {
    let mut depth: usize = 0;
    loop {
        let c = source
            .next()
            .ok_or_else(|| format!("missing terminating ';' for '{}'", into))?;
        into.push(c);
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced '>' in '{}'", into))?
            }
            ';' if depth == 0 => return Ok(()),
            _ => (),
        }
    }
}

/// Skip over a `<...>` formal type parameter section
fn skip_type_parameters(source: &mut Peekable<Chars>) -> Result<(), String> {
    let mut depth: usize = 0;
    loop {
        match source.next() {
            None => return Err(String::from("unterminated type parameters")),
            Some('<') => depth += 1,
            Some('>') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Some(_) => (),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generic_method() {
        let types = TypeEntry::decompose(
            "(Ljava/util/ArrayList;Ljava/util/List;)Ljava/lang/Object;",
            Some("<T:Ljava/lang/Object;>(Ljava/util/ArrayList<TT;>;Ljava/util/List<Ljava/lang/String;>;)TT;"),
        )
        .unwrap();

        assert_eq!(
            types,
            vec![
                TypeEntry {
                    real: String::from("Ljava/util/ArrayList;"),
                    generic: Some(String::from("Ljava/util/ArrayList<TT;>;")),
                },
                TypeEntry {
                    real: String::from("Ljava/util/List;"),
                    generic: Some(String::from("Ljava/util/List<Ljava/lang/String;>;")),
                },
                TypeEntry {
                    real: String::from("Ljava/lang/Object;"),
                    generic: Some(String::from("TT;")),
                },
            ]
        );
    }

    #[test]
    fn without_signature() {
        let types = TypeEntry::decompose("(I[[JLjava/lang/String;)V", None).unwrap();
        let reals: Vec<&str> = types.iter().map(|t| t.real.as_str()).collect();
        assert_eq!(reals, vec!["I", "[[J", "Ljava/lang/String;", "V"]);
        assert!(types.iter().all(|t| t.generic.is_none()));
    }

    #[test]
    fn nested_type_arguments() {
        let types = split_types(
            "(Ljava/util/Map<Ljava/lang/String;Ljava/util/List<+TT;>;>;[TT;)Ljava/util/Map$Entry<**>;",
        )
        .unwrap();
        assert_eq!(
            types,
            vec![
                "Ljava/util/Map<Ljava/lang/String;Ljava/util/List<+TT;>;>;",
                "[TT;",
                "Ljava/util/Map$Entry<**>;",
            ]
        );
    }

    #[test]
    fn throws_clauses_are_skipped() {
        let types = split_types("<E:Ljava/lang/Exception;>()V^TE;^Ljava/io/IOException;").unwrap();
        assert_eq!(types, vec!["V"]);
    }

    #[test]
    fn field_types() {
        assert_eq!(split_types("I").unwrap(), vec!["I"]);
        assert_eq!(
            split_types("Ljava/util/List<Ljava/lang/String;>;").unwrap(),
            vec!["Ljava/util/List<Ljava/lang/String;>;"]
        );
    }

    #[test]
    fn malformed() {
        assert!(split_types("(Ljava/lang/String").is_err());
        assert!(split_types("(Q)V").is_err());
        assert!(split_types("([)V").is_err());
        assert!(matches!(
            TypeEntry::decompose("(I)V", Some("(II)V")),
            Err(Error::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn class_names() {
        let string = TypeEntry::new("Ljava/lang/String;");
        assert!(!string.is_primitive());
        assert_eq!(string.class_name().unwrap(), "java.lang.String");
        assert_eq!(string.generic_or_real(), "Ljava/lang/String;");

        let int = TypeEntry::new("I");
        assert!(int.is_primitive());
        assert!(matches!(int.class_name(), Err(Error::PrimitiveClassName(_))));

        assert_eq!(TypeEntry::new("[[I").java_name(), "int[][]");
        assert_eq!(
            TypeEntry::new("[Ljava/lang/Object;").java_name(),
            "java.lang.Object[]"
        );
    }
}
