use std::fmt::Display;

use confess_types::models::{Confession, PaymentRecord, Prompt, PromptPayment, UserId};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::kv;
use crate::{Database, Result, StoreError};

const RECENT_PROMPTS: &str = "prompts:recent";

// -- Keys --

fn prompt_key(id: &str) -> String {
    format!("prompt:{}", id)
}

fn prompt_payment_key(id: &str) -> String {
    format!("prompt_payment:{}", id)
}

fn confession_key(prompt_id: &str, user_id: impl Display) -> String {
    format!("confession:{}:{}", prompt_id, user_id)
}

fn confessors_key(prompt_id: &str) -> String {
    format!("confessions:{}", prompt_id)
}

fn payment_key(prompt_id: &str, user_id: UserId) -> String {
    format!("payment:{}:{}", prompt_id, user_id)
}

fn payers_key(prompt_id: &str) -> String {
    format!("payments:{}", prompt_id)
}

fn user_prompts_key(user_id: UserId) -> String {
    format!("user:{}:prompts", user_id)
}

fn user_confessions_key(user_id: UserId) -> String {
    format!("user:{}:confessions", user_id)
}

fn user_payments_key(user_id: UserId) -> String {
    format!("user:{}:payments", user_id)
}

fn tx_key(hash: &str) -> String {
    format!("tx:{}", hash.to_ascii_lowercase())
}

impl Database {
    // -- Prompts --

    /// Store a new prompt and index it by recency and author.
    pub fn create_prompt(&self, prompt: &Prompt) -> Result<Prompt> {
        self.store_prompt(prompt, None)
    }

    /// Store a prompt together with the payment that paid for it.
    /// Fails with `Conflict` if the transaction already backs another record.
    pub fn create_paid_prompt(&self, prompt: &Prompt, payment: &PromptPayment) -> Result<Prompt> {
        self.store_prompt(prompt, Some(payment))
    }

    fn store_prompt(&self, prompt: &Prompt, payment: Option<&PromptPayment>) -> Result<Prompt> {
        validate_prompt(prompt)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let key = prompt_key(&prompt.id);
            if let Some(payment) = payment {
                claim_transaction(&tx, &payment.transaction_hash, &key)?;
                kv::set_json(&tx, &prompt_payment_key(&prompt.id), payment)?;
            }

            if !kv::set_json_if_absent(&tx, &key, prompt)? {
                return Err(StoreError::Conflict(format!("prompt {} already exists", prompt.id)));
            }
            kv::zadd(&tx, RECENT_PROMPTS, &prompt.id, prompt.created_at)?;
            kv::sadd(&tx, &user_prompts_key(prompt.author_id), &prompt.id)?;

            tx.commit()?;
            Ok(())
        })?;

        info!("Prompt {} created by {}", prompt.id, prompt.author_id);
        Ok(prompt.clone())
    }

    pub fn get_prompt(&self, id: &str) -> Result<Option<Prompt>> {
        self.with_conn(|conn| kv::get_json(conn, &prompt_key(id)))
    }

    /// Fetch several prompts, skipping ids that no longer resolve.
    pub fn get_prompts(&self, ids: &[String]) -> Result<Vec<Prompt>> {
        self.with_conn(|conn| {
            let mut prompts = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(p) = kv::get_json(conn, &prompt_key(id))? {
                    prompts.push(p);
                }
            }
            Ok(prompts)
        })
    }

    /// Newest first.
    pub fn list_recent_prompt_ids(&self, limit: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| kv::zrevrange(conn, RECENT_PROMPTS, limit))
    }

    pub fn list_user_prompt_ids(&self, user_id: UserId) -> Result<Vec<String>> {
        self.with_conn(|conn| kv::smembers(conn, &user_prompts_key(user_id)))
    }

    pub fn count_user_prompts(&self, user_id: UserId) -> Result<u64> {
        self.with_conn(|conn| kv::scard(conn, &user_prompts_key(user_id)))
    }

    /// Prompts the author created without a creation payment. Paid prompts
    /// do not use up the free allowance.
    pub fn count_free_prompts(&self, user_id: UserId) -> Result<u64> {
        self.with_conn(|conn| {
            let mut free = 0;
            for id in kv::smembers(conn, &user_prompts_key(user_id))? {
                if !kv::exists(conn, &prompt_payment_key(&id))? {
                    free += 1;
                }
            }
            Ok(free)
        })
    }

    pub fn get_prompt_payment(&self, prompt_id: &str) -> Result<Option<PromptPayment>> {
        self.with_conn(|conn| kv::get_json(conn, &prompt_payment_key(prompt_id)))
    }

    // -- Confessions --

    /// Store a confession. Returns false, changing nothing, when this user
    /// already answered the prompt.
    pub fn add_confession(&self, confession: &Confession) -> Result<bool> {
        if confession.prompt_id.trim().is_empty() {
            return Err(StoreError::Validation("promptId is required".into()));
        }
        if confession.user_id == 0 {
            return Err(StoreError::Validation("userId is required".into()));
        }

        let added = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let pkey = prompt_key(&confession.prompt_id);
            let mut prompt: Prompt = kv::get_json(&tx, &pkey)?
                .ok_or_else(|| StoreError::NotFound(format!("prompt {}", confession.prompt_id)))?;

            let key = confession_key(&confession.prompt_id, confession.user_id);
            if !kv::set_json_if_absent(&tx, &key, confession)? {
                return Ok(false);
            }

            let confessors = confessors_key(&confession.prompt_id);
            kv::sadd(&tx, &confessors, &confession.user_id.to_string())?;
            kv::sadd(&tx, &user_confessions_key(confession.user_id), &confession.prompt_id)?;

            // The counter always mirrors the set of distinct confessors.
            prompt.total_confession_count = kv::scard(&tx, &confessors)?;
            kv::set_json(&tx, &pkey, &prompt)?;

            tx.commit()?;
            Ok(true)
        })?;

        if added {
            debug!("Confession on {} by {}", confession.prompt_id, confession.user_id);
        }
        Ok(added)
    }

    pub fn get_confession(&self, prompt_id: &str, user_id: UserId) -> Result<Option<Confession>> {
        self.with_conn(|conn| kv::get_json(conn, &confession_key(prompt_id, user_id)))
    }

    /// Oldest first.
    pub fn list_confessions(&self, prompt_id: &str) -> Result<Vec<Confession>> {
        self.with_conn(|conn| {
            let user_ids = kv::smembers(conn, &confessors_key(prompt_id))?;
            let mut confessions = Vec::with_capacity(user_ids.len());
            for uid in user_ids {
                if let Some(c) = kv::get_json(conn, &confession_key(prompt_id, &uid))? {
                    confessions.push(c);
                }
            }
            Ok(confessions)
        })
    }

    pub fn list_user_confessions(&self, user_id: UserId) -> Result<Vec<Confession>> {
        self.with_conn(|conn| {
            let prompt_ids = kv::smembers(conn, &user_confessions_key(user_id))?;
            let mut confessions = Vec::with_capacity(prompt_ids.len());
            for pid in prompt_ids {
                if let Some(c) = kv::get_json(conn, &confession_key(&pid, user_id))? {
                    confessions.push(c);
                }
            }
            Ok(confessions)
        })
    }

    // -- Payments --

    /// Record a reveal payment. A second payment by the same user for the
    /// same prompt is a no-op and returns false.
    pub fn record_payment(&self, payment: &PaymentRecord) -> Result<bool> {
        if payment.prompt_id.trim().is_empty() {
            return Err(StoreError::Validation("promptId is required".into()));
        }
        if payment.user_id == 0 {
            return Err(StoreError::Validation("userId is required".into()));
        }
        if payment.transaction_hash.trim().is_empty() {
            return Err(StoreError::Validation("transactionHash is required".into()));
        }

        let recorded = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let payers = payers_key(&payment.prompt_id);
            let member = payment.user_id.to_string();
            if kv::sismember(&tx, &payers, &member)? {
                return Ok(false);
            }

            let key = payment_key(&payment.prompt_id, payment.user_id);
            claim_transaction(&tx, &payment.transaction_hash, &key)?;
            kv::set_json(&tx, &key, payment)?;
            kv::sadd(&tx, &payers, &member)?;
            kv::sadd(&tx, &user_payments_key(payment.user_id), &payment.prompt_id)?;

            tx.commit()?;
            Ok(true)
        })?;

        if recorded {
            info!(
                "Payment {} recorded for prompt {} by {}",
                payment.transaction_hash, payment.prompt_id, payment.user_id
            );
        }
        Ok(recorded)
    }

    pub fn has_user_paid(&self, prompt_id: &str, user_id: UserId) -> Result<bool> {
        self.with_conn(|conn| kv::sismember(conn, &payers_key(prompt_id), &user_id.to_string()))
    }

    pub fn payer_count(&self, prompt_id: &str) -> Result<u64> {
        self.with_conn(|conn| kv::scard(conn, &payers_key(prompt_id)))
    }

    pub fn has_anyone_paid(&self, prompt_id: &str) -> Result<bool> {
        Ok(self.payer_count(prompt_id)? > 0)
    }

    pub fn get_payment(&self, prompt_id: &str, user_id: UserId) -> Result<Option<PaymentRecord>> {
        self.with_conn(|conn| kv::get_json(conn, &payment_key(prompt_id, user_id)))
    }

    pub fn list_user_payments(&self, user_id: UserId) -> Result<Vec<PaymentRecord>> {
        self.with_conn(|conn| {
            let prompt_ids = kv::smembers(conn, &user_payments_key(user_id))?;
            let mut payments = Vec::with_capacity(prompt_ids.len());
            for pid in prompt_ids {
                if let Some(p) = kv::get_json(conn, &payment_key(&pid, user_id))? {
                    payments.push(p);
                }
            }
            Ok(payments)
        })
    }

    /// Whether a transaction hash already backs a payment or paid prompt.
    pub fn is_transaction_used(&self, hash: &str) -> Result<bool> {
        self.with_conn(|conn| kv::exists(conn, &tx_key(hash)))
    }
}

fn validate_prompt(prompt: &Prompt) -> Result<()> {
    if prompt.id.trim().is_empty() {
        return Err(StoreError::Validation("id is required".into()));
    }
    if prompt.content.trim().is_empty() {
        return Err(StoreError::Validation("content is required".into()));
    }
    if prompt.author_id == 0 {
        return Err(StoreError::Validation("authorId is required".into()));
    }
    if prompt.expires_at <= prompt.created_at {
        return Err(StoreError::Validation("expiresAt must be after createdAt".into()));
    }
    Ok(())
}

/// Bind a transaction hash to the record it paid for.
fn claim_transaction(conn: &Connection, hash: &str, owner: &str) -> Result<()> {
    if !kv::set_json_if_absent(conn, &tx_key(hash), &owner)? {
        return Err(StoreError::Conflict(format!("transaction {} already used", hash)));
    }
    Ok(())
}
