use unicode_general_category::{get_general_category, GeneralCategory};

use crate::codec::KeyValue;

/// Letra = categoría general L* (Lu, Ll, Lt, Lm, Lo).
/// `char::is_alphabetic` además acepta marcas y números-letra, que acá separan.
fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// map: separa el contenido en palabras (todo lo que no es letra es separador)
/// y emite (palabra, "1") por cada aparición.
pub fn map(_filename: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split(|c: char| !is_letter(c))
        .filter(|w| !w.is_empty())
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

/// reduce: cantidad de apariciones de la palabra.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
