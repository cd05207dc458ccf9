use quiz_types::{
    ChangePasswordRequest, CreateRoomRequest, Difficulty, LoginRequest, RegisterRequest,
    ResetPasswordRequest, SettingsUpdate,
};
use regex::Regex;
use std::sync::LazyLock;
use validator::{Validate, ValidationError, ValidationErrors};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern compiles"));
static OTP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("otp pattern compiles"));

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_upper && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some("Password must contain an uppercase letter and a number".into());
        Err(err)
    }
}

/// Flatten validation errors into one line, field by field, for display.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl LoginForm {
    pub fn into_request(self) -> Result<LoginRequest, ValidationErrors> {
        self.validate()?;
        Ok(LoginRequest {
            email: self.email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 3, max = 20, message = "Username must be 3 to 20 characters"),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, numbers and underscores")
    )]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(
        length(min = 6, message = "Password must be at least 6 characters"),
        custom(function = validate_password_strength)
    )]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn into_request(self) -> Result<RegisterRequest, ValidationErrors> {
        self.validate()?;
        Ok(RegisterRequest {
            username: self.username,
            email: self.email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ChangePasswordForm {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn into_request(self) -> Result<ChangePasswordRequest, ValidationErrors> {
        self.validate()?;
        Ok(ChangePasswordRequest {
            current_password: self.current_password,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ResetPasswordForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(regex(path = *OTP_RE, message = "Code must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn into_request(self) -> Result<ResetPasswordRequest, ValidationErrors> {
        self.validate()?;
        Ok(ResetPasswordRequest {
            email: self.email,
            otp: self.otp,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct VerifyEmailForm {
    #[validate(regex(path = *OTP_RE, message = "Code must be 6 digits"))]
    pub otp: String,
}

impl VerifyEmailForm {
    pub fn into_otp(self) -> Result<String, ValidationErrors> {
        self.validate()?;
        Ok(self.otp)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct CreateRoomForm {
    #[validate(length(min = 1, message = "Pick a category"))]
    pub category: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 5, max = 20, message = "Questions must be between 5 and 20"))]
    pub number_of_questions: u32,
    #[validate(range(min = 5, max = 60, message = "Time per question must be 5 to 60 seconds"))]
    pub time_per_question: u32,
    pub is_public: bool,
}

impl Default for CreateRoomForm {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            difficulty: Difficulty::Medium,
            number_of_questions: 10,
            time_per_question: 15,
            is_public: true,
        }
    }
}

impl CreateRoomForm {
    pub fn into_request(self) -> Result<CreateRoomRequest, ValidationErrors> {
        self.validate()?;
        Ok(CreateRoomRequest {
            category: self.category,
            difficulty: self.difficulty,
            number_of_questions: self.number_of_questions,
            time_per_question: self.time_per_question,
            is_public: self.is_public,
        })
    }
}

/// Host-side settings edit; only the filled fields are sent.
#[derive(Debug, Clone, Default, Validate)]
pub struct SettingsForm {
    #[validate(length(min = 1, message = "Pick a category"))]
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 5, max = 20, message = "Questions must be between 5 and 20"))]
    pub number_of_questions: Option<u32>,
    #[validate(range(min = 5, max = 60, message = "Time per question must be 5 to 60 seconds"))]
    pub time_per_question: Option<u32>,
    pub is_public: Option<bool>,
}

impl SettingsForm {
    pub fn into_request(self) -> Result<SettingsUpdate, ValidationErrors> {
        self.validate()?;
        Ok(SettingsUpdate {
            category: self.category,
            difficulty: self.difficulty,
            number_of_questions: self.number_of_questions,
            time_per_question: self.time_per_question,
            is_public: self.is_public,
        })
    }
}
