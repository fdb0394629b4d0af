//! Business details, products, clients and vendors

use anyhow::{bail, Context, Result};
use khata_core::models::{ClientDetails, Product, Vendor, GST_RATES};
use khata_core::stock::stock_status;
use khata_core::Session;

use super::truncate;

/// Fields to change on the business details; `None` keeps the current value
#[derive(Debug, Default)]
pub struct BusinessUpdate {
    pub name: Option<String>,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub terms: Option<String>,
    pub bank_details: Option<String>,
}

impl BusinessUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gstin.is_none()
            && self.address.is_none()
            && self.terms.is_none()
            && self.bank_details.is_none()
    }
}

pub fn cmd_business(session: &mut Session, update: BusinessUpdate) -> Result<()> {
    if !update.is_empty() {
        let mut business = session.books().business.clone();
        if let Some(name) = update.name {
            business.name = name;
        }
        if let Some(gstin) = update.gstin {
            business.gstin = gstin.trim().to_uppercase();
        }
        if let Some(address) = update.address {
            business.address = address;
        }
        if let Some(terms) = update.terms {
            business.terms = terms;
        }
        if let Some(bank_details) = update.bank_details {
            business.bank_details = bank_details;
        }
        session
            .set_business(business)
            .context("Failed to save business details")?;
        println!("✅ Business details updated");
    }

    let business = &session.books().business;
    println!();
    println!("🏢 Business");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Name:    {}", business.name);
    println!("   GSTIN:   {}", business.gstin);
    println!("   Address: {}", business.address);
    if !business.terms.is_empty() {
        println!("   Terms:   {}", business.terms);
    }
    if !business.bank_details.is_empty() {
        println!("   Bank:    {}", business.bank_details);
    }
    println!();

    Ok(())
}

// ========== Products ==========

/// Fields to change on a product; `None` keeps the current value
#[derive(Debug, Default)]
pub struct ProductUpdate {
    pub price: Option<f64>,
    pub gst_rate: Option<f64>,
    pub hsn: Option<String>,
    pub stock: Option<f64>,
    pub low_stock_threshold: Option<f64>,
}

fn check_rate(rate: f64) -> Result<()> {
    if !GST_RATES.contains(&rate) {
        bail!("Invalid GST rate {} (valid: 0, 5, 12, 18, 28)", rate);
    }
    Ok(())
}

pub fn cmd_products_list(session: &Session) -> Result<()> {
    let settings = session.settings();
    let products = &session.books().products;

    if products.is_empty() {
        println!("No products found. Add one with: khata products add <name> --price <price>");
        return Ok(());
    }

    println!(
        "{:28} {:>8} {:>12} {:>5} {:>9} {:12}",
        "Name", "HSN", "Price", "GST%", "Stock", "Status"
    );
    println!("{}", "-".repeat(80));
    for product in products {
        let stock = if product.track_stock {
            format!("{}", product.stock)
        } else {
            "-".to_string()
        };
        println!(
            "{:28} {:>8} {:>12} {:>5} {:>9} {:12}",
            truncate(&product.name, 28),
            product.hsn,
            settings.format_money(product.price),
            product.gst_rate,
            stock,
            stock_status(product).as_str(),
        );
    }

    Ok(())
}

pub fn cmd_products_add(
    session: &mut Session,
    name: &str,
    price: f64,
    gst_rate: f64,
    hsn: &str,
    stock: Option<f64>,
    low_stock_threshold: f64,
) -> Result<()> {
    check_rate(gst_rate)?;
    let product = session
        .add_product(Product {
            id: String::new(),
            name: name.to_string(),
            hsn: hsn.trim().to_string(),
            price,
            gst_rate,
            track_stock: stock.is_some(),
            stock: stock.unwrap_or(0.0),
            low_stock_threshold,
        })
        .context("Failed to add product")?;

    match stock {
        Some(stock) => println!("✅ Added product: {} ({} in stock)", product.name, stock),
        None => println!("✅ Added service: {}", product.name),
    }
    Ok(())
}

pub fn cmd_products_update(session: &mut Session, key: &str, update: ProductUpdate) -> Result<()> {
    let mut product = session
        .books()
        .find_product(key)
        .cloned()
        .with_context(|| format!("Product not found: {}", key))?;

    if let Some(price) = update.price {
        product.price = price;
    }
    if let Some(rate) = update.gst_rate {
        check_rate(rate)?;
        product.gst_rate = rate;
    }
    if let Some(hsn) = update.hsn {
        product.hsn = hsn.trim().to_string();
    }
    if let Some(stock) = update.stock {
        product.track_stock = true;
        product.stock = stock;
    }
    if let Some(threshold) = update.low_stock_threshold {
        product.low_stock_threshold = threshold;
    }

    let name = product.name.clone();
    session
        .update_product(product)
        .context("Failed to update product")?;
    println!("✅ Updated product: {}", name);
    Ok(())
}

pub fn cmd_products_remove(session: &mut Session, key: &str) -> Result<()> {
    let product = session
        .remove_product(key)
        .with_context(|| format!("Failed to remove product {}", key))?;
    println!("🗑️  Removed product: {}", product.name);
    Ok(())
}

// ========== Clients & vendors ==========

pub fn cmd_clients_list(session: &Session) -> Result<()> {
    let clients = &session.books().clients;
    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    println!("{:30} {:16} {}", "Name", "GSTIN", "Address");
    println!("{}", "-".repeat(80));
    for client in clients {
        println!(
            "{:30} {:16} {}",
            truncate(&client.name, 30),
            client.gstin,
            truncate(&client.address, 32)
        );
    }
    Ok(())
}

pub fn cmd_clients_add(session: &mut Session, name: &str, gstin: &str, address: &str) -> Result<()> {
    let client = session
        .add_client(ClientDetails {
            id: String::new(),
            name: name.to_string(),
            gstin: gstin.trim().to_uppercase(),
            address: address.to_string(),
        })
        .context("Failed to add client")?;
    println!("✅ Added client: {} ({})", client.name, client.id);
    Ok(())
}

pub fn cmd_vendors_list(session: &Session) -> Result<()> {
    let vendors = &session.books().vendors;
    if vendors.is_empty() {
        println!("No vendors found.");
        return Ok(());
    }

    println!("{:30} {:16} {}", "Name", "GSTIN", "Address");
    println!("{}", "-".repeat(80));
    for vendor in vendors {
        println!(
            "{:30} {:16} {}",
            truncate(&vendor.name, 30),
            vendor.gstin,
            truncate(&vendor.address, 32)
        );
    }
    Ok(())
}

pub fn cmd_vendors_add(session: &mut Session, name: &str, gstin: &str, address: &str) -> Result<()> {
    let vendor = session
        .add_vendor(Vendor {
            id: String::new(),
            name: name.to_string(),
            gstin: gstin.trim().to_uppercase(),
            address: address.to_string(),
        })
        .context("Failed to add vendor")?;
    println!("✅ Added vendor: {} ({})", vendor.name, vendor.id);
    Ok(())
}
