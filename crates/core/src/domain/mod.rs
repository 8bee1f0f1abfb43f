pub mod quotation;
pub mod request;
