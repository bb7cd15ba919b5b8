use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::domain::{DeliveryId, DeliverymanId, FileId, RecipientId};
use storage::{NewRecipient, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/server.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or promote) the administrator that receives problem notifications.
    CreateAdmin {
        name: String,
        email: String,
    },
    CreateUser {
        name: String,
        email: String,
    },
    CreateRecipient {
        name: String,
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        complement: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        zip_code: Option<String>,
    },
    CreateDelivery {
        recipient_id: i64,
        product: String,
        #[arg(long)]
        deliveryman_id: Option<i64>,
    },
    AssignDelivery {
        delivery_id: i64,
        deliveryman_id: i64,
    },
    StartDelivery {
        delivery_id: i64,
    },
    FinishDelivery {
        delivery_id: i64,
        signature_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateAdmin { name, email } => {
            let user_id = storage.create_user(&name, &email, true).await?;
            println!("created administrator user_id={}", user_id.0);
        }
        Command::CreateUser { name, email } => {
            let user_id = storage.create_user(&name, &email, false).await?;
            println!("created user_id={}", user_id.0);
        }
        Command::CreateRecipient {
            name,
            street,
            number,
            complement,
            state,
            city,
            zip_code,
        } => {
            let recipient_id = storage
                .create_recipient(&NewRecipient {
                    name,
                    street,
                    number,
                    complement,
                    state,
                    city,
                    zip_code,
                })
                .await?;
            println!("created recipient_id={}", recipient_id.0);
        }
        Command::CreateDelivery {
            recipient_id,
            product,
            deliveryman_id,
        } => {
            let delivery_id = storage
                .create_delivery(
                    &product,
                    RecipientId(recipient_id),
                    deliveryman_id.map(DeliverymanId),
                )
                .await?;
            println!("created delivery_id={}", delivery_id.0);
        }
        Command::AssignDelivery {
            delivery_id,
            deliveryman_id,
        } => {
            if storage
                .find_deliveryman(DeliverymanId(deliveryman_id))
                .await?
                .is_none()
            {
                bail!("deliveryman {deliveryman_id} does not exist");
            }
            if !storage
                .assign_delivery(DeliveryId(delivery_id), DeliverymanId(deliveryman_id))
                .await?
            {
                bail!("delivery {delivery_id} does not exist");
            }
            println!("assigned delivery_id={delivery_id} to deliveryman_id={deliveryman_id}");
        }
        Command::StartDelivery { delivery_id } => {
            if !storage
                .start_delivery(DeliveryId(delivery_id), Utc::now())
                .await?
            {
                bail!("delivery {delivery_id} does not exist");
            }
            println!("started delivery_id={delivery_id}");
        }
        Command::FinishDelivery {
            delivery_id,
            signature_id,
        } => {
            if !storage
                .finish_delivery(DeliveryId(delivery_id), FileId(signature_id), Utc::now())
                .await?
            {
                bail!("delivery {delivery_id} does not exist");
            }
            println!("finished delivery_id={delivery_id}");
        }
    }

    Ok(())
}
