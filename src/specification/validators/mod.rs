//! Single-entity validation
//!
//! A validator answers "would this entity be part of the result" for the
//! parts of a specification that decide membership: filters and search
//! criteria. Ordering, pagination and includes play no role.

use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::specification::expressions::search_groups;
use crate::specification::specification::EntitySpecification;
use std::sync::Arc;

/// One membership check
pub trait Validator<T: Entity>: Send + Sync {
    fn is_valid(&self, entity: &T, specification: &dyn EntitySpecification<T>) -> SpecResult<bool>;
}

/// Every filter must hold
#[derive(Debug, Clone, Copy, Default)]
pub struct WhereValidator;

impl<T: Entity> Validator<T> for WhereValidator {
    fn is_valid(&self, entity: &T, specification: &dyn EntitySpecification<T>) -> SpecResult<bool> {
        for expression in specification.where_expressions() {
            if !(expression.predicate()?)(entity) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Every search group must have at least one matching criterion
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchValidator;

impl<T: Entity> Validator<T> for SearchValidator {
    fn is_valid(&self, entity: &T, specification: &dyn EntitySpecification<T>) -> SpecResult<bool> {
        for (_, members) in search_groups(specification.search_criteria()) {
            let mut matched = false;
            for criterion in members {
                if criterion.is_match(entity)? {
                    matched = true;
                    break;
                }
            }
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Runs every validator and requires all of them to pass
pub struct SpecificationValidator<T: Entity> {
    validators: Vec<Arc<dyn Validator<T>>>,
}

impl<T: Entity> Default for SpecificationValidator<T> {
    fn default() -> Self {
        Self::new(vec![Arc::new(WhereValidator), Arc::new(SearchValidator)])
    }
}

impl<T: Entity> SpecificationValidator<T> {
    pub fn new(validators: Vec<Arc<dyn Validator<T>>>) -> Self {
        Self { validators }
    }

    pub fn is_valid(&self, entity: &T, specification: &dyn EntitySpecification<T>) -> SpecResult<bool> {
        for validator in &self.validators {
            if !validator.is_valid(entity, specification)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
