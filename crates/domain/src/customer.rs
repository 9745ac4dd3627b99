//! Customer records and their single address.

use chrono::NaiveDate;

use common::CustomerId;
use store::{Address, Customer, CustomerStore};

use crate::error::{DomainError, Result};

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub province: String,
    pub city: String,
    pub street: String,
}

pub struct CustomerService<S> {
    store: S,
}

impl<S: CustomerStore> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a customer together with their address.
    #[tracing::instrument(skip(self, new, address), fields(email = %new.email))]
    pub async fn create_customer(&self, new: NewCustomer, address: NewAddress) -> Result<Customer> {
        if new.first_name.trim().is_empty() {
            return Err(DomainError::validation("first_name", "must not be empty"));
        }
        if new.last_name.trim().is_empty() {
            return Err(DomainError::validation("last_name", "must not be empty"));
        }
        if !new.email.contains('@') {
            return Err(DomainError::validation("email", "must be a valid email address"));
        }

        let customer = Customer {
            id: CustomerId::new(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone_number: new.phone_number,
            birth_date: new.birth_date,
        };
        let address = Address {
            customer_id: customer.id,
            province: address.province,
            city: address.city,
            street: address.street,
        };
        let customer = self.store.insert_customer(customer, address).await?;
        metrics::counter!("customers_created_total").increment(1);
        Ok(customer)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<(Customer, Address)> {
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", id))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }
}
