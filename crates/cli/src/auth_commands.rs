use {
    anyhow::Result,
    clap::Subcommand,
    storefront_client::{ApiClient, User},
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Forget the stored credentials.
    SignOut,
    /// Show whether a credential pair is stored.
    Status,
    /// Email a password reset code.
    ResetCode {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using an emailed reset code.
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
        #[arg(long, env = "STOREFRONT_NEW_PASSWORD")]
        new_password: String,
    },
}

pub async fn handle_auth(client: &ApiClient, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::SignIn { email, password } => {
            let user = client.sign_in(&email, &password).await?;
            print_signed_in(&email, user.as_ref());
        },
        AuthAction::SignUp {
            email,
            password,
            first_name,
            last_name,
        } => {
            let user = client
                .sign_up(
                    &email,
                    &password,
                    first_name.as_deref(),
                    last_name.as_deref(),
                )
                .await?;
            print_signed_in(&email, user.as_ref());
        },
        AuthAction::SignOut => {
            client.sign_out()?;
            println!("Signed out");
        },
        AuthAction::Status => {
            if client.is_authenticated() {
                println!("Signed in");
            } else {
                println!("Not signed in.");
            }
        },
        AuthAction::ResetCode { email } => {
            client.send_password_reset_code(&email).await?;
            println!("Reset code sent to {email}");
        },
        AuthAction::ResetPassword {
            email,
            code,
            new_password,
        } => {
            client.reset_password(&email, &code, &new_password).await?;
            println!("Password updated for {email}");
        },
    }
    Ok(())
}

fn print_signed_in(email: &str, user: Option<&User>) {
    match user {
        Some(user) if user.is_staff => println!("Signed in as {} (staff)", user.email),
        Some(user) => println!("Signed in as {}", user.email),
        None => println!("Signed in as {email}"),
    }
}
