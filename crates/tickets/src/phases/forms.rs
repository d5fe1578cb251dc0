//! Form binding and validation for the phases.
//!
//! Forms are either bound to submitted data (POST) or unbound and showing
//! the current values (GET). Binding parses every field up front, so a bound
//! form knows its errors and cleaned values right away.

use std::collections::HashMap;

use serde::Deserialize;

use convention_core::shop::{Customer, CustomerInput, OrderProduct, Product};
use convention_core::{Email, OrderProductId, PhoneNumber, PostalCode, ProductId};

use crate::db::{RepositoryError, TicketStore};

use super::Validation;

const REQUIRED: &str = "This field is required.";

/// Submitted form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FormData(HashMap<String, String>);

impl FormData {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Trimmed value, `None` when missing or blank.
    fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A field as the form partial renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub value: String,
    pub input_type: &'static str,
    pub required: bool,
    pub checked: bool,
    pub help: String,
    pub error: Option<String>,
}

impl FieldView {
    fn new(name: impl Into<String>, label: impl Into<String>, input_type: &'static str) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value: String::new(),
            input_type,
            required: false,
            checked: false,
            help: String::new(),
            error: None,
        }
    }
}

/// The form a phase works with.
#[derive(Debug, Clone)]
pub enum PhaseForm {
    /// Phases without input. Always valid.
    Null,
    /// One form per line item.
    Products(Vec<OrderProductForm>),
    Customer(Box<CustomerForm>),
}

impl PhaseForm {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Products(forms) => forms.iter().all(OrderProductForm::is_valid),
            Self::Customer(form) => form.is_valid(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> Vec<FieldView> {
        match self {
            Self::Null => Vec::new(),
            Self::Products(forms) => forms.iter().map(OrderProductForm::field).collect(),
            Self::Customer(form) => form.fields(),
        }
    }
}

/// Quantity of one product in the order.
#[derive(Debug, Clone)]
pub struct OrderProductForm {
    order_product: OrderProduct,
    product: Product,
    raw: String,
    cleaned: Option<u32>,
    error: Option<String>,
    bound: bool,
}

impl OrderProductForm {
    /// Bind to `data` when given, otherwise show the stored count.
    #[must_use]
    pub fn new(order_product: OrderProduct, product: Product, data: Option<&FormData>) -> Self {
        let mut form = Self {
            order_product,
            product,
            raw: order_product.count.to_string(),
            cleaned: None,
            error: None,
            bound: data.is_some(),
        };

        if let Some(data) = data {
            let name = form.field_name();
            form.raw = data.get(&name).unwrap_or_default().trim().to_string();
            match parse_count(&form.raw) {
                Ok(count) => form.cleaned = Some(count),
                Err(message) => form.error = Some(message.to_string()),
            }
        }

        form
    }

    /// Field name prefix, unique per line item.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("o{}", self.order_product.id)
    }

    #[must_use]
    pub fn field_name(&self) -> String {
        format!("{}-count", self.prefix())
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.bound && self.error.is_none()
    }

    #[must_use]
    pub const fn cleaned_count(&self) -> Option<u32> {
        self.cleaned
    }

    #[must_use]
    pub const fn order_product_id(&self) -> OrderProductId {
        self.order_product.id
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    #[must_use]
    pub fn field(&self) -> FieldView {
        FieldView {
            value: self.raw.clone(),
            required: true,
            help: format!("{} / pcs", self.product.price),
            error: self.error.clone(),
            ..FieldView::new(self.field_name(), self.product.name.clone(), "number")
        }
    }
}

fn parse_count(raw: &str) -> Result<u32, &'static str> {
    if raw.is_empty() {
        return Err(REQUIRED);
    }
    let count: i32 = raw.parse().map_err(|_| "Enter a whole number.")?;
    u32::try_from(count).map_err(|_| "Ensure this value is greater than or equal to 0.")
}

/// Validate product forms together. Any invalid form fails the whole set.
#[must_use]
pub fn multiform_validate(forms: &[OrderProductForm]) -> Validation {
    if forms.iter().all(OrderProductForm::is_valid) {
        Validation::valid()
    } else {
        Validation::syntax()
    }
}

/// Save the counts of all product forms as one unit.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a form is not valid, otherwise
/// whatever the store reports. Nothing is written on error.
pub async fn multiform_save(
    store: &dyn TicketStore,
    forms: &[OrderProductForm],
) -> Result<(), RepositoryError> {
    let counts = forms
        .iter()
        .map(|form| {
            form.cleaned_count()
                .map(|count| (form.order_product_id(), count))
                .ok_or_else(|| {
                    RepositoryError::Conflict(format!("invalid form {}", form.prefix()))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    store.save_order_products(&counts).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CustomerField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    PostalCode,
    City,
    AllowMarketingEmail,
}

impl CustomerField {
    const ALL: [Self; 8] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::PostalCode,
        Self::City,
        Self::AllowMarketingEmail,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::PostalCode => "postal_code",
            Self::City => "city",
            Self::AllowMarketingEmail => "allow_marketing_email",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Phone => "Phone number",
            Self::Address => "Street address",
            Self::PostalCode => "Postal code",
            Self::City => "City",
            Self::AllowMarketingEmail => "I may be sent information about future events",
        }
    }

    const fn input_type(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "tel",
            Self::AllowMarketingEmail => "checkbox",
            _ => "text",
        }
    }

    const fn required(self) -> bool {
        !matches!(self, Self::Phone | Self::AllowMarketingEmail)
    }
}

/// Delivery details of the buyer.
#[derive(Debug, Clone)]
pub struct CustomerForm {
    values: HashMap<CustomerField, String>,
    errors: HashMap<CustomerField, String>,
    cleaned: Option<CustomerInput>,
}

impl CustomerForm {
    /// Bind to `data` when given, otherwise start from `initial`.
    #[must_use]
    pub fn new(initial: Option<&Customer>, data: Option<&FormData>) -> Self {
        match data {
            Some(data) => Self::bind(data),
            None => Self::unbound(initial),
        }
    }

    fn unbound(initial: Option<&Customer>) -> Self {
        let mut values = HashMap::new();
        if let Some(c) = initial {
            values.insert(CustomerField::FirstName, c.first_name.clone());
            values.insert(CustomerField::LastName, c.last_name.clone());
            values.insert(CustomerField::Email, c.email.to_string());
            values.insert(
                CustomerField::Phone,
                c.phone.as_ref().map(ToString::to_string).unwrap_or_default(),
            );
            values.insert(CustomerField::Address, c.address.clone());
            values.insert(CustomerField::PostalCode, c.postal_code.to_string());
            values.insert(CustomerField::City, c.city.clone());
            if c.allow_marketing_email {
                values.insert(CustomerField::AllowMarketingEmail, "on".to_string());
            }
        }
        Self {
            values,
            errors: HashMap::new(),
            cleaned: None,
        }
    }

    fn bind(data: &FormData) -> Self {
        let mut values = HashMap::new();
        let mut errors = HashMap::new();

        for field in CustomerField::ALL {
            let value = data.value(field.name()).unwrap_or_default().to_string();
            if field.required() && value.is_empty() {
                errors.insert(field, REQUIRED.to_string());
            }
            values.insert(field, value);
        }

        let text = |field: CustomerField| values.get(&field).cloned().unwrap_or_default();

        let email = Email::parse(&text(CustomerField::Email)).map_err(|e| e.to_string());
        let phone = Some(text(CustomerField::Phone))
            .filter(|p| !p.is_empty())
            .map(|p| PhoneNumber::parse(&p))
            .transpose()
            .map_err(|e| e.to_string());
        let postal_code =
            PostalCode::parse(&text(CustomerField::PostalCode)).map_err(|e| e.to_string());

        for (field, result) in [
            (CustomerField::Email, email.as_ref().err()),
            (CustomerField::Phone, phone.as_ref().err()),
            (CustomerField::PostalCode, postal_code.as_ref().err()),
        ] {
            if let Some(message) = result {
                errors.entry(field).or_insert_with(|| message.clone());
            }
        }

        let cleaned = match (email, phone, postal_code) {
            (Ok(email), Ok(phone), Ok(postal_code)) if errors.is_empty() => Some(CustomerInput {
                first_name: text(CustomerField::FirstName),
                last_name: text(CustomerField::LastName),
                email,
                phone,
                address: text(CustomerField::Address),
                postal_code,
                city: text(CustomerField::City),
                allow_marketing_email: !text(CustomerField::AllowMarketingEmail).is_empty(),
            }),
            _ => None,
        };

        Self {
            values,
            errors,
            cleaned,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.cleaned.is_some()
    }

    /// The validated input, if the form is bound and valid.
    #[must_use]
    pub const fn cleaned(&self) -> Option<&CustomerInput> {
        self.cleaned.as_ref()
    }

    #[must_use]
    pub fn error(&self, name: &str) -> Option<&str> {
        CustomerField::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .and_then(|f| self.errors.get(&f))
            .map(String::as_str)
    }

    #[must_use]
    pub fn fields(&self) -> Vec<FieldView> {
        CustomerField::ALL
            .into_iter()
            .map(|field| {
                let value = self.values.get(&field).cloned().unwrap_or_default();
                FieldView {
                    checked: field == CustomerField::AllowMarketingEmail && !value.is_empty(),
                    value,
                    required: field.required(),
                    error: self.errors.get(&field).cloned(),
                    ..FieldView::new(field.name(), field.label(), field.input_type())
                }
            })
            .collect()
    }
}
