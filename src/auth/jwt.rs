use jsonwebtoken::{DecodingKey, Validation, decode, errors::Error, errors::ErrorKind};
use serde::{Deserialize, Serialize};

/// Claims issued by the identity service. Tokens are only verified here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// Verifies signature and expiry. Refresh tokens never authorize API calls.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, Error> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;

    if claims.token_type != TokenType::Access {
        return Err(ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) fn issue_for_test(
    role: u8,
    employee_id: Option<u64>,
    token_type: TokenType,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        user_id: 7,
        sub: "jdoe".into(),
        role,
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        jti: "test-jti".into(),
        token_type,
        employee_id,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_verifies() {
        let token = issue_for_test(3, Some(1000), TokenType::Access, "secret");
        let claims = verify_access_token(&token, "secret").unwrap();
        assert_eq!(claims.employee_id, Some(1000));
        assert_eq!(claims.sub, "jdoe");
    }

    #[test]
    fn refresh_token_and_wrong_secret_are_refused() {
        let refresh = issue_for_test(3, Some(1000), TokenType::Refresh, "secret");
        assert!(verify_access_token(&refresh, "secret").is_err());

        let access = issue_for_test(3, Some(1000), TokenType::Access, "secret");
        assert!(verify_access_token(&access, "other").is_err());
    }
}
