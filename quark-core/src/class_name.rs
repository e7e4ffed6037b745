//! Dual smali/java class name identity, adapted from the class-name
//! handling used throughout smali-oriented tooling: store whichever form
//! was given, compare and hash on the canonical smali form.

use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

#[derive(Eq, Debug, Clone, Ord, PartialOrd)]
pub struct ClassName {
    name: String,
}

impl<T: Into<String>> From<T> for ClassName {
    fn from(value: T) -> Self {
        Self::new(value.into())
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        self.name.as_str()
    }
}

impl AsRef<ClassName> for ClassName {
    fn as_ref(&self) -> &ClassName {
        self
    }
}

impl ClassName {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub fn is_smali(&self) -> bool {
        class_is_smali(&self.name)
    }

    pub fn is_java(&self) -> bool {
        !self.is_smali()
    }

    pub fn get_java_name(&self) -> Cow<'_, str> {
        if self.is_java() {
            Cow::Borrowed(self.name.as_str())
        } else {
            Cow::Owned(smali_name_to_java(&self.name))
        }
    }

    pub fn get_smali_name(&self) -> Cow<'_, str> {
        if self.is_smali() {
            Cow::Borrowed(self.name.as_str())
        } else {
            Cow::Owned(java_name_to_smali(&self.name))
        }
    }

    /// Is `Ljava/lang/Object;`, the root of the class hierarchy climb in
    /// stage-1 subclass resolution.
    pub fn is_java_lang_object(&self) -> bool {
        self.get_smali_name().as_ref() == "Ljava/lang/Object;"
    }
}

impl Serialize for ClassName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get_smali_name().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClassName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(ClassName::new(String::deserialize(deserializer)?))
    }
}

fn class_is_smali(s: &str) -> bool {
    s.starts_with('L') && s.ends_with(';')
}

fn java_name_to_smali(name: &str) -> String {
    let mut new_name = String::with_capacity(name.len() + 2);
    new_name.push('L');
    for c in name.chars() {
        if c == '.' {
            new_name.push('/');
        } else {
            new_name.push(c);
        }
    }
    new_name.push(';');
    new_name
}

fn smali_name_to_java(name: &str) -> String {
    let mut new_name = String::with_capacity(name.len().saturating_sub(2));
    for c in name.chars().skip(1).take(name.len().saturating_sub(2)) {
        if c == '/' {
            new_name.push('.');
        } else {
            new_name.push(c);
        }
    }
    new_name
}

impl Hash for ClassName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.get_smali_name().as_bytes())
    }
}

impl<T: AsRef<str> + ?Sized> PartialEq<T> for ClassName {
    fn eq(&self, other: &T) -> bool {
        let as_str = other.as_ref();
        if class_is_smali(as_str) {
            self.get_smali_name() == as_str
        } else {
            self.get_java_name() == as_str
        }
    }
}

impl Display for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get_smali_name())
    }
}
