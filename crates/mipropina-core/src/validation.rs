//! Field validators for user-submitted text.
//!
//! Every validator trims its input, never panics, and returns a
//! [`Validated`] value: either the cleaned values or a map from field
//! name (as spelled on the wire) to a short, user-facing reason.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MiPropinaError, MiPropinaResult};
use crate::models::rating::{
    COMMENT_MAX_LENGTH, FEATURE_MAX_LENGTH, MAX_FEATURES, MAX_SCORE, MIN_SCORE, Scores,
};
use crate::slug::slugify;

/// Field name to reason.
pub type FieldErrors = BTreeMap<String, String>;

/// Outcome of a validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Invalid(FieldErrors),
}

impl<T> Validated<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> MiPropinaResult<T> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(fields) => Err(MiPropinaError::validation(fields)),
        }
    }

    fn from_parts(value: T, errors: FieldErrors) -> Self {
        if errors.is_empty() {
            Self::Valid(value)
        } else {
            Self::Invalid(errors)
        }
    }
}

/// Length bounds for a trimmed text field, in characters.
#[derive(Debug, Clone, Copy)]
pub struct LengthRule {
    pub min: usize,
    pub max: usize,
}

impl LengthRule {
    fn accepts(&self, value: &str) -> bool {
        let len = value.chars().count();
        len >= self.min && len <= self.max
    }
}

pub const FIRST_NAME_RULE: LengthRule = LengthRule { min: 2, max: 60 };
pub const LAST_NAME_RULE: LengthRule = LengthRule { min: 2, max: 60 };
pub const PHONE_RULE: LengthRule = LengthRule { min: 8, max: 24 };
pub const ADDRESS_RULE: LengthRule = LengthRule { min: 5, max: 120 };
pub const BRAND_NAME_RULE: LengthRule = LengthRule { min: 2, max: 80 };

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÀ-ÿ' -]+$").expect("name pattern is valid"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+() -]+$").expect("phone pattern is valid"));

// Host must be mercadopago.com or mercadopago.com.<cc>, optionally under a
// subdomain, followed by a non-empty path. No userinfo, no port.
static MERCADOPAGO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:[a-z0-9-]+\.)*mercadopago\.com(?:\.[a-z]{2})?/\S+$")
        .expect("payment link pattern is valid")
});

// ---------------------------------------------------------------------------
// Personal data & onboarding
// ---------------------------------------------------------------------------

/// Raw editable personal data as submitted.
#[derive(Debug, Clone, Default)]
pub struct PersonalDataInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

/// Trimmed, validated personal data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

impl PersonalData {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Raw onboarding form.
#[derive(Debug, Clone, Default)]
pub struct OnboardingInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub brand_name: String,
}

/// Validated onboarding form with its derived brand slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingData {
    pub personal: PersonalData,
    pub brand_name: String,
    pub brand_slug: String,
}

fn check_personal(input: &PersonalDataInput, errors: &mut FieldErrors) -> PersonalData {
    let clean = PersonalData {
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        phone: input.phone.trim().to_string(),
        address: input.address.trim().to_string(),
    };

    if !FIRST_NAME_RULE.accepts(&clean.first_name) || !NAME_PATTERN.is_match(&clean.first_name) {
        errors.insert("firstName".into(), "Nombre invalido".into());
    }
    if !LAST_NAME_RULE.accepts(&clean.last_name) || !NAME_PATTERN.is_match(&clean.last_name) {
        errors.insert("lastName".into(), "Apellido invalido".into());
    }
    if !PHONE_RULE.accepts(&clean.phone) || !PHONE_PATTERN.is_match(&clean.phone) {
        errors.insert("phone".into(), "Telefono invalido".into());
    }
    if !ADDRESS_RULE.accepts(&clean.address) {
        errors.insert("address".into(), "Direccion invalida".into());
    }

    clean
}

pub fn validate_personal_data(input: &PersonalDataInput) -> Validated<PersonalData> {
    let mut errors = FieldErrors::new();
    let clean = check_personal(input, &mut errors);
    Validated::from_parts(clean, errors)
}

pub fn validate_onboarding(input: &OnboardingInput) -> Validated<OnboardingData> {
    let mut errors = FieldErrors::new();
    let personal = check_personal(
        &PersonalDataInput {
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
        },
        &mut errors,
    );

    let brand_name = input.brand_name.trim().to_string();
    let brand_slug = slugify(&brand_name);
    if !BRAND_NAME_RULE.accepts(&brand_name) || brand_slug.is_empty() {
        errors.insert("brandName".into(), "Marca invalida".into());
    }

    Validated::from_parts(
        OnboardingData {
            personal,
            brand_name,
            brand_slug,
        },
        errors,
    )
}

// ---------------------------------------------------------------------------
// Rating configuration & submissions
// ---------------------------------------------------------------------------

/// Trim labels, drop blanks, and enforce the count and length limits.
///
/// Order and duplicates are preserved. More than [`MAX_FEATURES`]
/// non-blank labels is an error; the list is never truncated.
pub fn validate_rating_features(features: &[String]) -> Validated<Vec<String>> {
    let normalized: Vec<String> = features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    let mut errors = FieldErrors::new();
    if normalized.len() > MAX_FEATURES {
        errors.insert(
            "features".into(),
            format!("No podes guardar mas de {MAX_FEATURES} caracteristicas."),
        );
    } else if normalized
        .iter()
        .any(|f| f.chars().count() > FEATURE_MAX_LENGTH)
    {
        errors.insert(
            "features".into(),
            format!("Cada caracteristica puede tener hasta {FEATURE_MAX_LENGTH} caracteres."),
        );
    }

    Validated::from_parts(normalized, errors)
}

/// Validated rating submission payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSubmissionData {
    pub scores: Scores,
    pub comment: Option<String>,
}

/// Check a public rating against the tenant's current feature count.
///
/// `stars` may carry unset trailing slots (`None`), which are dropped
/// before counting. What remains must be exactly `feature_count`
/// integers in `1..=5`.
pub fn validate_rating_submission(
    feature_count: usize,
    stars: &[Option<f64>],
    comment: Option<&str>,
) -> Validated<RatingSubmissionData> {
    let mut errors = FieldErrors::new();
    let mut scores: Scores = [None; MAX_FEATURES];

    let supplied_len = stars
        .iter()
        .rposition(Option::is_some)
        .map(|last| last + 1)
        .unwrap_or(0);
    let supplied = &stars[..supplied_len];

    if feature_count == 0 {
        errors.insert(
            "stars".into(),
            "Este restaurante no tiene caracteristicas para calificar.".into(),
        );
    } else if supplied.len() != feature_count {
        errors.insert(
            "stars".into(),
            "La cantidad de puntajes no coincide con las caracteristicas configuradas.".into(),
        );
    } else {
        for (slot, star) in supplied.iter().enumerate() {
            match star.and_then(as_score) {
                Some(score) if slot < MAX_FEATURES => scores[slot] = Some(score),
                _ => {
                    errors.insert(
                        "stars".into(),
                        "Cada puntaje debe ser un numero entero entre 1 y 5.".into(),
                    );
                    break;
                }
            }
        }
    }

    let comment = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > COMMENT_MAX_LENGTH)
    {
        errors.insert(
            "comment".into(),
            format!("El comentario puede tener hasta {COMMENT_MAX_LENGTH} caracteres."),
        );
    }

    Validated::from_parts(RatingSubmissionData { scores, comment }, errors)
}

fn as_score(value: f64) -> Option<u8> {
    if value.fract() != 0.0 || value < f64::from(MIN_SCORE) || value > f64::from(MAX_SCORE) {
        return None;
    }
    Some(value as u8)
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

/// Raw employee form.
#[derive(Debug, Clone, Default)]
pub struct EmployeeInput {
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub payment_link: String,
}

/// Trimmed, validated employee fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeFields {
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub phone: String,
    pub payment_link: String,
}

/// Whether `url` is a Mercado Pago link by host, not by substring.
pub fn is_mercadopago_link(url: &str) -> bool {
    MERCADOPAGO_LINK.is_match(url.trim())
}

pub fn validate_employee(input: &EmployeeInput) -> Validated<EmployeeFields> {
    let clean = EmployeeFields {
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        dni: input.dni.trim().to_string(),
        phone: input.phone.trim().to_string(),
        payment_link: input.payment_link.trim().to_string(),
    };

    let mut errors = FieldErrors::new();
    let required = [
        ("name", &clean.first_name),
        ("lastName", &clean.last_name),
        ("dni", &clean.dni),
        ("phone", &clean.phone),
        ("mercadopagoLink", &clean.payment_link),
    ];
    for (field, value) in required {
        if value.is_empty() {
            errors.insert(field.into(), "Completa todos los campos obligatorios.".into());
        }
    }

    if !clean.payment_link.is_empty() && !is_mercadopago_link(&clean.payment_link) {
        errors.insert(
            "mercadopagoLink".into(),
            "El link debe ser una URL valida de Mercado Pago.".into(),
        );
    }

    Validated::from_parts(clean, errors)
}
