//! CSDL document served at `/odata/$metadata`, generated from the same
//! field-map declarations the query engine validates against.

use crate::resource::{all_resources, EdmType, Resource};

pub const NAMESPACE: &str = "org.reso.metadata";

fn entity_type(xml: &mut String, resource: &Resource) {
    xml.push_str(&format!("      <EntityType Name=\"{}\">\n", resource.name));
    xml.push_str("        <Key>\n");
    xml.push_str(&format!(
        "          <PropertyRef Name=\"{}\"/>\n",
        resource.key_field
    ));
    xml.push_str("        </Key>\n");
    for field in resource.fields {
        xml.push_str(&format!(
            "        <Property Name=\"{}\" Type=\"{}\"/>\n",
            field.name,
            field.ty.as_edm()
        ));
    }
    for expansion in resource.expansions {
        xml.push_str(&format!(
            "        <NavigationProperty Name=\"{}\" Type=\"{}.{}\"/>\n",
            expansion.name, NAMESPACE, expansion.target
        ));
    }
    xml.push_str("      </EntityType>\n");
}

pub fn csdl() -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<edmx:Edmx Version=\"4.0\" xmlns:edmx=\"http://docs.oasis-open.org/odata/ns/edmx\">\n",
    );
    xml.push_str("  <edmx:DataServices>\n");
    xml.push_str(&format!(
        "    <Schema Namespace=\"{}\" xmlns=\"http://docs.oasis-open.org/odata/ns/edm\">\n",
        NAMESPACE
    ));

    xml.push_str("      <ComplexType Name=\"Media\">\n");
    for (name, ty) in [
        ("MediaKey", EdmType::String),
        ("ResourceRecordKey", EdmType::String),
        ("MediaURL", EdmType::String),
        ("Order", EdmType::Int32),
    ] {
        xml.push_str(&format!(
            "        <Property Name=\"{}\" Type=\"{}\"/>\n",
            name,
            ty.as_edm()
        ));
    }
    xml.push_str("      </ComplexType>\n");

    for resource in all_resources() {
        entity_type(&mut xml, resource);
    }

    xml.push_str("      <EntityContainer Name=\"Container\">\n");
    for resource in all_resources() {
        xml.push_str(&format!(
            "        <EntitySet Name=\"{}\" EntityType=\"{}.{}\"/>\n",
            resource.name, NAMESPACE, resource.name
        ));
    }
    xml.push_str("      </EntityContainer>\n");

    xml.push_str("    </Schema>\n");
    xml.push_str("  </edmx:DataServices>\n");
    xml.push_str("</edmx:Edmx>\n");
    xml
}
